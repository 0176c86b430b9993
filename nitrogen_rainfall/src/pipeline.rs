/// End-to-end analysis run: load → derive → join → analyze.
///
/// `run` reads the inputs named in the configuration; `analyze` takes
/// already-loaded rows so tests and other callers can skip the file system.
/// The run is strictly sequential and stops at the first error.

use chrono::Utc;
use serde::Serialize;

use crate::analysis::composition::{CompositionSummary, TernaryPoint, composition_by_tributary, ternary_points};
use crate::analysis::correlation::{
    CorrelationMatrix, RainfallCorrelation, TributaryComparison, compare_tributaries, cross_tributary_matrix,
    rainfall_correlations,
};
use crate::analysis::regression::{RainfallResponse, fit_rainfall_response};
use crate::analysis::summary::{SpeciesSummary, summarize};
use crate::config::{AnalysisConfig, Config};
use crate::features::RainfallSeries;
use crate::ingest::{chemistry, rainfall};
use crate::join::{CoverageReport, RainfallIndex, check_coverage, join_measurements};
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, Measurement, NitrogenSpecies, RainfallFeature, RainfallRecord};
use crate::tributaries::Tributary;

/// Everything the run computed, in report order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub measurement_count: usize,
    pub rainfall_days: usize,
    /// Days inside the rainfall record without a PRCP value.
    pub rainfall_unreported_days: usize,
    pub rainfall_duplicates_dropped: usize,
    pub coverage: CoverageReport,
    pub summaries: Vec<SpeciesSummary>,
    pub composition: Vec<CompositionSummary>,
    pub ternary_points: Vec<TernaryPoint>,
    pub correlation_matrices: Vec<CorrelationMatrix>,
    pub comparisons: Vec<TributaryComparison>,
    pub rainfall_correlations: Vec<RainfallCorrelation>,
    pub regressions: Vec<RainfallResponse>,
}

/// Load both inputs from disk and analyze them.
pub fn run(config: &Config) -> Result<AnalysisReport, AnalysisError> {
    let measurements = chemistry::load_measurements(&config.inputs.chemistry_csv)?;
    let rainfall = rainfall::load_rainfall(&config.inputs.rainfall_csv, &config.rainfall_columns())?;
    analyze(&measurements, &rainfall, &config.analysis)
}

/// Analyze loaded measurements and rainfall rows.
pub fn analyze(
    measurements: &[Measurement],
    rainfall: &[RainfallRecord],
    settings: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    if measurements.is_empty() {
        return Err(AnalysisError::EmptyInput("chemistry measurements".to_string()));
    }

    // Derive
    let series = RainfallSeries::from_records(rainfall)?;
    let features = series.derive_features();

    // Join
    let coverage = check_coverage(
        &series,
        measurements,
        RainfallFeature::SumFive.window_days(),
        settings.strict_coverage,
    )?;
    let index = RainfallIndex::build(&features);
    let joined = join_measurements(measurements, &index);

    // Analyze
    logging::info(Stage::Analyze, None, "Computing summaries and composition");
    let summaries = summarize(measurements);
    let points = ternary_points(measurements);
    let composition = composition_by_tributary(&points);

    let correlation_matrices: Vec<CorrelationMatrix> = NitrogenSpecies::ALL
        .iter()
        .map(|&species| cross_tributary_matrix(&joined, species))
        .collect();

    let mut comparisons = Vec::new();
    for species in NitrogenSpecies::ALL {
        for (i, &first) in Tributary::ALL.iter().enumerate() {
            for &second in &Tributary::ALL[i + 1..] {
                match compare_tributaries(&joined, species, first, second, settings.significance_method) {
                    Ok(cmp) => comparisons.push(cmp),
                    Err(e) => logging::warn(
                        Stage::Analyze,
                        Some(&format!("{}/{} {}", first.code(), second.code(), species.label())),
                        &format!("Comparison skipped: {}", e),
                    ),
                }
            }
        }
    }

    let rainfall_correlations = rainfall_correlations(&joined);

    let regression_settings = settings.regression_settings();
    let regressions = settings
        .regression_species
        .iter()
        .map(|&species| fit_rainfall_response(&joined, settings.regression_tributary, species, &regression_settings))
        .collect::<Result<Vec<_>, _>>()?;

    logging::info(
        Stage::Analyze,
        None,
        &format!(
            "Analysis complete: {} comparisons, {} regressions",
            comparisons.len(),
            regressions.len()
        ),
    );

    Ok(AnalysisReport {
        generated_at: Utc::now().to_rfc3339(),
        measurement_count: measurements.len(),
        rainfall_days: series.day_count(),
        rainfall_unreported_days: series.unreported_days(),
        rainfall_duplicates_dropped: series.duplicates_dropped(),
        coverage,
        summaries,
        composition,
        ternary_points: points,
        correlation_matrices,
        comparisons,
        rainfall_correlations,
        regressions,
    })
}
