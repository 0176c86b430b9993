/// Core data types for the tributary nitrogen / rainfall analysis.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no analysis logic and no I/O, only types, unit conversion,
/// and the crate-wide error enum.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tributaries::Tributary;

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// GHCN-Daily reports PRCP in tenths of a millimetre.
pub const TENTHS_PER_MM: f64 = 10.0;

/// Converts a raw rainfall value in tenths of mm to millimetres.
pub fn tenths_to_mm(tenths: i64) -> f64 {
    tenths as f64 / TENTHS_PER_MM
}

/// Inverse of `tenths_to_mm`. Rounds to the nearest tenth so that
/// `mm_to_tenths(tenths_to_mm(t)) == t` for every integer input.
pub fn mm_to_tenths(mm: f64) -> i64 {
    (mm * TENTHS_PER_MM).round() as i64
}

// ---------------------------------------------------------------------------
// Measurement types
// ---------------------------------------------------------------------------

/// One water-chemistry sample taken at a tributary on a calendar date.
///
/// All concentrations are mg/L. `None` means the sample was not analysed
/// for that species or the sheet carried a missing-value sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub date: NaiveDate,
    pub tributary: Tributary,
    pub total_nitrogen: Option<f64>,
    pub nitrate: Option<f64>,
    pub ammonium: Option<f64>,
    pub organic_nitrogen: Option<f64>,
}

/// The four nitrogen species reported per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NitrogenSpecies {
    TotalNitrogen,
    Nitrate,
    Ammonium,
    OrganicNitrogen,
}

impl NitrogenSpecies {
    pub const ALL: [NitrogenSpecies; 4] = [
        NitrogenSpecies::TotalNitrogen,
        NitrogenSpecies::Nitrate,
        NitrogenSpecies::Ammonium,
        NitrogenSpecies::OrganicNitrogen,
    ];

    /// Returns this species' concentration from a measurement.
    pub fn value(self, m: &Measurement) -> Option<f64> {
        match self {
            NitrogenSpecies::TotalNitrogen => m.total_nitrogen,
            NitrogenSpecies::Nitrate => m.nitrate,
            NitrogenSpecies::Ammonium => m.ammonium,
            NitrogenSpecies::OrganicNitrogen => m.organic_nitrogen,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NitrogenSpecies::TotalNitrogen => "TN",
            NitrogenSpecies::Nitrate => "NO3",
            NitrogenSpecies::Ammonium => "NH4",
            NitrogenSpecies::OrganicNitrogen => "ON",
        }
    }
}

impl std::fmt::Display for NitrogenSpecies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Rainfall types
// ---------------------------------------------------------------------------

/// Daily precipitation total for one calendar date, in millimetres.
/// `None` for a day the station did not report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainfallRecord {
    pub date: NaiveDate,
    pub precipitation_mm: Option<f64>,
}

/// Antecedent-rainfall features for one day of the rainfall series.
///
/// Sums exclude the current day. Offsets that fall before the first day of
/// the series contribute 0 rather than making the feature missing; an
/// unreported day inside the window makes the feature `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedRainfallFeatures {
    pub date: NaiveDate,
    pub precipitation_mm: Option<f64>,
    /// Precipitation on the previous day.
    pub lag_one: Option<f64>,
    /// Sum over the previous 3 days.
    pub sum_three: Option<f64>,
    /// Sum over the previous 5 days.
    pub sum_five: Option<f64>,
}

/// The derived rainfall features available as regressors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallFeature {
    LagOne,
    SumThree,
    SumFive,
}

impl RainfallFeature {
    pub const ALL: [RainfallFeature; 3] = [
        RainfallFeature::LagOne,
        RainfallFeature::SumThree,
        RainfallFeature::SumFive,
    ];

    pub fn value(self, f: &DerivedRainfallFeatures) -> Option<f64> {
        match self {
            RainfallFeature::LagOne => f.lag_one,
            RainfallFeature::SumThree => f.sum_three,
            RainfallFeature::SumFive => f.sum_five,
        }
    }

    /// Number of prior days the feature looks back over.
    pub fn window_days(self) -> u64 {
        match self {
            RainfallFeature::LagOne => 1,
            RainfallFeature::SumThree => 3,
            RainfallFeature::SumFive => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RainfallFeature::LagOne => "lag1",
            RainfallFeature::SumThree => "sum3",
            RainfallFeature::SumFive => "sum5",
        }
    }
}

/// A measurement paired with the rainfall features for its date.
///
/// `rainfall` is `None` when the rainfall series has no row for the
/// measurement date; the measurement itself is always kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub measurement: Measurement,
    pub rainfall: Option<DerivedRainfallFeatures>,
}

impl JoinedRecord {
    /// The feature value, or `None` when the date has no rainfall row or its
    /// window covers an unreported day.
    pub fn feature(&self, feature: RainfallFeature) -> Option<f64> {
        self.rainfall.as_ref().and_then(|r| feature.value(r))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that stop an analysis run.
///
/// There is no recovery path: any of these aborts the run and is reported
/// by the binary.
#[derive(Debug)]
pub enum AnalysisError {
    /// An input or output file could not be opened, read or written.
    Io(std::io::Error),
    /// The CSV reader rejected the input.
    Csv(String),
    /// The configuration file could not be parsed or is inconsistent.
    Config(String),
    /// A data row could not be interpreted.
    MalformedRow { source: String, line: u64, reason: String },
    /// A site name in the chemistry sheet is not in the tributary registry.
    UnknownTributary(String),
    /// An input produced no usable rows.
    EmptyInput(String),
    /// The daily rainfall series skips one or more calendar days.
    RainfallGap { after: NaiveDate, before: NaiveDate },
    /// Measurements fall inside the zero-filled head of the rainfall series.
    InsufficientRainfallHistory { rainfall_start: NaiveDate, affected: usize },
    /// A regression could not be fitted to the supplied data.
    DegenerateFit(String),
    /// Too few paired observations for a statistic.
    InsufficientData { needed: usize, got: usize },
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Io(e) => write!(f, "I/O error: {}", e),
            AnalysisError::Csv(msg) => write!(f, "CSV error: {}", msg),
            AnalysisError::Config(msg) => write!(f, "Config error: {}", msg),
            AnalysisError::MalformedRow { source, line, reason } => {
                write!(f, "Malformed row in {} at line {}: {}", source, line, reason)
            }
            AnalysisError::UnknownTributary(name) => write!(f, "Unknown tributary: {}", name),
            AnalysisError::EmptyInput(what) => write!(f, "No usable rows in {}", what),
            AnalysisError::RainfallGap { after, before } => {
                write!(f, "Rainfall series has a gap between {} and {}", after, before)
            }
            AnalysisError::InsufficientRainfallHistory { rainfall_start, affected } => write!(
                f,
                "Rainfall series starts {}; {} measurement(s) fall inside the zero-filled window",
                rainfall_start, affected
            ),
            AnalysisError::DegenerateFit(msg) => write!(f, "Degenerate fit: {}", msg),
            AnalysisError::InsufficientData { needed, got } => {
                write!(f, "Insufficient data: need {} observations, got {}", needed, got)
            }
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::Io(e)
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        AnalysisError::Csv(e.to_string())
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(e: toml::de::Error) -> Self {
        AnalysisError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Config(format!("JSON serialization failed: {}", e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
