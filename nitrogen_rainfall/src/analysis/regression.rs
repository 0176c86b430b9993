/// Concentration response to antecedent rainfall at a single tributary.
///
/// Model: `ln(concentration) = a + b · ln(1 + sum_five)`.
///
/// Both an ordinary and a Theil–Sen fit are always produced. The OLS
/// influence diagnostics decide which one the report leads with: any
/// outlier or high-leverage observation makes the robust fit preferred.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::logging::{self, Stage};
use crate::model::{AnalysisError, JoinedRecord, NitrogenSpecies, RainfallFeature};
use crate::stats::regression::{LinearFit, RobustFit, ols, theil_sen};
use crate::tributaries::Tributary;

/// Thresholds for the OLS reliability check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionSettings {
    /// |studentized residual| above this is an outlier.
    pub outlier_threshold: f64,
    /// Leverage above this multiple of the mean leverage (2/n) is high.
    pub leverage_multiplier: f64,
}

impl Default for RegressionSettings {
    fn default() -> Self {
        Self {
            outlier_threshold: 2.0,
            leverage_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitChoice {
    Ordinary,
    Robust,
}

/// Rows set aside before fitting, by reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Exclusions {
    pub missing_rainfall: usize,
    pub missing_concentration: usize,
    /// Zero concentrations have no logarithm.
    pub non_positive_concentration: usize,
}

impl Exclusions {
    pub fn total(&self) -> usize {
        self.missing_rainfall + self.missing_concentration + self.non_positive_concentration
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallResponse {
    pub tributary: Tributary,
    pub species: NitrogenSpecies,
    pub feature: RainfallFeature,
    pub n: usize,
    pub excluded: Exclusions,
    pub ordinary: LinearFit,
    pub robust: RobustFit,
    /// Sample dates the OLS diagnostics flagged as outliers.
    pub outlier_dates: Vec<NaiveDate>,
    /// Sample dates the OLS diagnostics flagged as high leverage.
    pub high_leverage_dates: Vec<NaiveDate>,
    /// Sample dates with Cook's distance above 4/n. Reported only; the
    /// fit preference does not depend on it.
    pub influential_dates: Vec<NaiveDate>,
    pub preferred: FitChoice,
}

impl RainfallResponse {
    /// Slope of the fit the diagnostics point to.
    pub fn preferred_slope(&self) -> f64 {
        match self.preferred {
            FitChoice::Ordinary => self.ordinary.slope,
            FitChoice::Robust => self.robust.slope,
        }
    }
}

/// Fit log concentration against log five-day antecedent rainfall for one
/// tributary and species.
///
/// Any failure to fit is returned as an error; callers do not retry.
pub fn fit_rainfall_response(
    records: &[JoinedRecord],
    tributary: Tributary,
    species: NitrogenSpecies,
    settings: &RegressionSettings,
) -> Result<RainfallResponse, AnalysisError> {
    let feature = RainfallFeature::SumFive;
    let mut excluded = Exclusions::default();
    let mut dates = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();

    for record in records.iter().filter(|r| r.measurement.tributary == tributary) {
        let Some(rain) = record.feature(feature) else {
            excluded.missing_rainfall += 1;
            continue;
        };
        let Some(conc) = species.value(&record.measurement) else {
            excluded.missing_concentration += 1;
            continue;
        };
        if conc <= 0.0 {
            excluded.non_positive_concentration += 1;
            continue;
        }
        dates.push(record.measurement.date);
        x.push(rain.ln_1p());
        y.push(conc.ln());
    }

    let subject = format!("{} {}", tributary.code(), species.label());
    logging::log_row_summary(Stage::Analyze, Some(&subject), "Regression input", x.len(), excluded.total());

    let ordinary = ols(&x, &y)?;
    let robust = theil_sen(&x, &y)?;

    let diagnostics = &ordinary.diagnostics;
    let outlier_dates: Vec<NaiveDate> = diagnostics
        .outliers(settings.outlier_threshold)
        .into_iter()
        .map(|i| dates[i])
        .collect();
    let high_leverage_dates: Vec<NaiveDate> = diagnostics
        .high_leverage(settings.leverage_multiplier)
        .into_iter()
        .map(|i| dates[i])
        .collect();
    let influential_dates: Vec<NaiveDate> = diagnostics.influential().into_iter().map(|i| dates[i]).collect();

    let preferred = if outlier_dates.is_empty() && high_leverage_dates.is_empty() {
        FitChoice::Ordinary
    } else {
        logging::info(
            Stage::Analyze,
            Some(&subject),
            &format!(
                "{} outlier(s), {} high-leverage point(s); preferring Theil-Sen fit",
                outlier_dates.len(),
                high_leverage_dates.len()
            ),
        );
        FitChoice::Robust
    };

    Ok(RainfallResponse {
        tributary,
        species,
        feature,
        n: x.len(),
        excluded,
        ordinary,
        robust,
        outlier_dates,
        high_leverage_dates,
        influential_dates,
        preferred,
    })
}
