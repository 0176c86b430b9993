/// Run configuration.
///
/// Loaded from a TOML file whose path comes from `NITROGEN_CONFIG` (a
/// `.env` file in the working directory is honoured) and defaults to
/// `nitrogen_rainfall.toml`. Only the two input paths are required:
///
/// ```toml
/// [inputs]
/// chemistry_csv = "data/tributary_nitrogen.csv"
/// rainfall_csv = "data/burlington_ghcn_daily.csv"
///
/// [analysis]
/// regression_tributary = "lewis_creek"
/// significance_method = "kendall"
/// ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analysis::regression::RegressionSettings;
use crate::ingest::rainfall::RainfallColumns;
use crate::logging::LogLevel;
use crate::model::{AnalysisError, NitrogenSpecies};
use crate::stats::correlation::CorrelationMethod;
use crate::tributaries::Tributary;

pub const CONFIG_PATH_VAR: &str = "NITROGEN_CONFIG";
pub const LOG_LEVEL_VAR: &str = "NITROGEN_LOG_LEVEL";
pub const DEFAULT_CONFIG_PATH: &str = "nitrogen_rainfall.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub inputs: InputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    pub chemistry_csv: PathBuf,
    pub rainfall_csv: PathBuf,
    #[serde(default = "default_date_column")]
    pub rainfall_date_column: String,
    #[serde(default = "default_precip_column")]
    pub rainfall_precip_column: String,
}

fn default_date_column() -> String {
    RainfallColumns::default().date
}

fn default_precip_column() -> String {
    RainfallColumns::default().precipitation
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Site whose samples the rainfall regressions are restricted to.
    pub regression_tributary: Tributary,
    /// Species regressed against rainfall.
    pub regression_species: Vec<NitrogenSpecies>,
    /// Test used for two-tributary comparisons.
    pub significance_method: CorrelationMethod,
    pub outlier_threshold: f64,
    pub leverage_multiplier: f64,
    /// Fail instead of warn when measurements fall in the zero-filled head
    /// of the rainfall series.
    pub strict_coverage: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let settings = RegressionSettings::default();
        Self {
            regression_tributary: Tributary::LewisCreek,
            regression_species: NitrogenSpecies::ALL.to_vec(),
            significance_method: CorrelationMethod::Kendall,
            outlier_threshold: settings.outlier_threshold,
            leverage_multiplier: settings.leverage_multiplier,
            strict_coverage: false,
        }
    }
}

impl AnalysisConfig {
    pub fn regression_settings(&self) -> RegressionSettings {
        RegressionSettings {
            outlier_threshold: self.outlier_threshold,
            leverage_multiplier: self.leverage_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub log_file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Write the full report as JSON here, in addition to the console tables.
    pub json_output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parse and validate a configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, AnalysisError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from the file named by `NITROGEN_CONFIG` (or the default path),
    /// then apply the `NITROGEN_LOG_LEVEL` override.
    pub fn from_env() -> Result<Self, AnalysisError> {
        // Missing .env is normal; only the variables matter.
        dotenv::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;

        if let Ok(level) = std::env::var(LOG_LEVEL_VAR) {
            config.logging.level = level;
            config.validate()?;
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        self.log_level()?;
        if !(self.analysis.outlier_threshold > 0.0) {
            return Err(AnalysisError::Config("analysis.outlier_threshold must be positive".to_string()));
        }
        if !(self.analysis.leverage_multiplier > 0.0) {
            return Err(AnalysisError::Config("analysis.leverage_multiplier must be positive".to_string()));
        }
        Ok(())
    }

    pub fn log_level(&self) -> Result<LogLevel, AnalysisError> {
        self.logging.level.parse().map_err(AnalysisError::Config)
    }

    pub fn rainfall_columns(&self) -> RainfallColumns {
        RainfallColumns {
            date: self.inputs.rainfall_date_column.clone(),
            precipitation: self.inputs.rainfall_precip_column.clone(),
        }
    }
}
