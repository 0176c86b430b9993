/// Antecedent-rainfall feature derivation.
///
/// Turns the daily rainfall rows into a contiguous per-day series and
/// computes, for every day, the rainfall that fell before it: the previous
/// day's total and the 3- and 5-day backward sums.
///
/// # Edge policy
/// Offsets that reach before the first day of the series contribute 0.
/// Early days therefore get a (possibly under-counted) number rather than a
/// missing value. `join::check_coverage` reports which measurements are
/// affected.
///
/// # Unreported days
/// A day inside the series without a PRCP value is missing, not zero: any
/// window that covers it yields `None`.

use chrono::{Days, NaiveDate};

use crate::logging::{self, Stage};
use crate::model::{AnalysisError, DerivedRainfallFeatures, RainfallFeature, RainfallRecord};

// ---------------------------------------------------------------------------
// Contiguous series
// ---------------------------------------------------------------------------

/// A daily rainfall series with exactly one entry per calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallSeries {
    start: NaiveDate,
    values_mm: Vec<Option<f64>>,
    duplicates_dropped: usize,
}

impl RainfallSeries {
    /// Build a series from loaded rows.
    ///
    /// Rows are ordered by date and reduced to one per date, keeping the
    /// first occurrence in input order. A missing calendar day is an error.
    pub fn from_records(records: &[RainfallRecord]) -> Result<Self, AnalysisError> {
        if records.is_empty() {
            return Err(AnalysisError::EmptyInput("rainfall series".to_string()));
        }

        // Stable sort keeps input order among rows sharing a date.
        let mut sorted = records.to_vec();
        sorted.sort_by_key(|r| r.date);
        let before = sorted.len();
        sorted.dedup_by_key(|r| r.date);
        let duplicates_dropped = before - sorted.len();

        if duplicates_dropped > 0 {
            logging::warn(
                Stage::Derive,
                None,
                &format!("Dropped {} duplicate rainfall row(s); first row per date kept", duplicates_dropped),
            );
        }

        for pair in sorted.windows(2) {
            if pair[0].date.succ_opt() != Some(pair[1].date) {
                return Err(AnalysisError::RainfallGap {
                    after: pair[0].date,
                    before: pair[1].date,
                });
            }
        }

        Ok(Self {
            start: sorted[0].date,
            values_mm: sorted.iter().map(|r| r.precipitation_mm).collect(),
            duplicates_dropped,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the series.
    pub fn end(&self) -> NaiveDate {
        // `values_mm` is never empty, see `from_records`.
        self.start + Days::new(self.values_mm.len() as u64 - 1)
    }

    /// Calendar days covered, reported or not.
    pub fn day_count(&self) -> usize {
        self.values_mm.len()
    }

    /// Days inside the series without a PRCP value.
    pub fn unreported_days(&self) -> usize {
        self.values_mm.iter().filter(|v| v.is_none()).count()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Compute the antecedent-rainfall features for every day.
    pub fn derive_features(&self) -> Vec<DerivedRainfallFeatures> {
        let lag_one = backward_window_sum(&self.values_mm, RainfallFeature::LagOne.window_days() as usize);
        let sum_three = backward_window_sum(&self.values_mm, RainfallFeature::SumThree.window_days() as usize);
        let sum_five = backward_window_sum(&self.values_mm, RainfallFeature::SumFive.window_days() as usize);

        let features: Vec<DerivedRainfallFeatures> = self
            .values_mm
            .iter()
            .enumerate()
            .map(|(i, &precipitation_mm)| DerivedRainfallFeatures {
                date: self.start + Days::new(i as u64),
                precipitation_mm,
                lag_one: lag_one[i],
                sum_three: sum_three[i],
                sum_five: sum_five[i],
            })
            .collect();

        logging::debug(
            Stage::Derive,
            None,
            &format!("Derived rainfall features for {} days ({} to {})", features.len(), self.start, self.end()),
        );

        features
    }
}

// ---------------------------------------------------------------------------
// Window primitive
// ---------------------------------------------------------------------------

/// Fixed-width backward rolling sum that excludes the current element.
///
/// `out[i] = values[i-1] + ... + values[i-width]`, where any index below 0
/// contributes 0 and any `None` inside the window makes `out[i]` `None`.
/// With `width == 1` this is a one-step lag.
pub fn backward_window_sum(values: &[Option<f64>], width: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(width);
            values[lo..i].iter().copied().sum()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
