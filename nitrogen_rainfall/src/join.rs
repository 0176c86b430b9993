/// Date join between chemistry samples and rainfall features.
///
/// The join is a lookup, not a merge: each measurement looks up the single
/// rainfall row for its calendar date. Dates with no rainfall row keep the
/// measurement and leave the rainfall side empty. There is no interpolation
/// and no nearest-date fallback.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::features::RainfallSeries;
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, DerivedRainfallFeatures, JoinedRecord, Measurement};

// ---------------------------------------------------------------------------
// Date index
// ---------------------------------------------------------------------------

/// Rainfall features keyed by calendar date, at most one per date.
#[derive(Debug, Clone, Default)]
pub struct RainfallIndex {
    by_date: HashMap<NaiveDate, DerivedRainfallFeatures>,
}

impl RainfallIndex {
    /// Index derived features by date. If two entries share a date the
    /// first one is kept.
    pub fn build(features: &[DerivedRainfallFeatures]) -> Self {
        let mut by_date = HashMap::with_capacity(features.len());
        for f in features {
            by_date.entry(f.date).or_insert(*f);
        }
        Self { by_date }
    }

    pub fn lookup(&self, date: NaiveDate) -> Option<&DerivedRainfallFeatures> {
        self.by_date.get(&date)
    }

    /// Distinct dates indexed.
    pub fn date_count(&self) -> usize {
        self.by_date.len()
    }
}

/// Attach rainfall features to every measurement.
///
/// Output order and length match `measurements`.
pub fn join_measurements(measurements: &[Measurement], index: &RainfallIndex) -> Vec<JoinedRecord> {
    logging::debug(
        Stage::Join,
        None,
        &format!("Joining {} measurement(s) against {} rainfall date(s)", measurements.len(), index.date_count()),
    );

    let joined: Vec<JoinedRecord> = measurements
        .iter()
        .map(|m| JoinedRecord {
            measurement: m.clone(),
            rainfall: index.lookup(m.date).copied(),
        })
        .collect();

    let matched = joined.iter().filter(|j| j.rainfall.is_some()).count();
    logging::log_row_summary(
        Stage::Join,
        None,
        "Rainfall match",
        matched,
        joined.len() - matched,
    );

    joined
}

// ---------------------------------------------------------------------------
// Coverage check
// ---------------------------------------------------------------------------

/// How well the rainfall series covers the measurement dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub rainfall_start: NaiveDate,
    pub rainfall_end: NaiveDate,
    pub first_measurement: Option<NaiveDate>,
    pub last_measurement: Option<NaiveDate>,
    /// Look-back window the check was run for, in days.
    pub window_days: u64,
    /// Measurements inside the series whose window reaches before its start.
    pub zero_filled: usize,
    /// Measurements dated outside the rainfall series.
    pub unmatched: usize,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.zero_filled == 0 && self.unmatched == 0
    }
}

/// Check that the rainfall series starts early enough for every
/// measurement to have a full look-back window.
///
/// A measurement on day `d` has a full window when `d - window_days` is on
/// or after the first rainfall day. With `strict` set, any measurement
/// whose window would be zero-filled is an error; otherwise it is logged.
pub fn check_coverage(
    series: &RainfallSeries,
    measurements: &[Measurement],
    window_days: u64,
    strict: bool,
) -> Result<CoverageReport, AnalysisError> {
    let rainfall_start = series.start();
    let rainfall_end = series.end();
    let full_window_from = rainfall_start
        .checked_add_days(Days::new(window_days))
        .unwrap_or(NaiveDate::MAX);

    let mut zero_filled = 0;
    let mut unmatched = 0;
    for m in measurements {
        if m.date < rainfall_start || m.date > rainfall_end {
            unmatched += 1;
        } else if m.date < full_window_from {
            zero_filled += 1;
        }
    }

    let report = CoverageReport {
        rainfall_start,
        rainfall_end,
        first_measurement: measurements.iter().map(|m| m.date).min(),
        last_measurement: measurements.iter().map(|m| m.date).max(),
        window_days,
        zero_filled,
        unmatched,
    };

    if zero_filled > 0 {
        let message = format!(
            "{} measurement(s) within {} days of rainfall start {}; their windows are zero-filled",
            zero_filled, window_days, rainfall_start
        );
        if strict {
            logging::error(Stage::Join, None, &message);
            return Err(AnalysisError::InsufficientRainfallHistory {
                rainfall_start,
                affected: zero_filled,
            });
        }
        logging::warn(Stage::Join, None, &message);
    }
    if unmatched > 0 {
        logging::warn(
            Stage::Join,
            None,
            &format!(
                "{} measurement(s) dated outside rainfall series {}..{}",
                unmatched, rainfall_start, rainfall_end
            ),
        );
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RainfallRecord;
    use crate::tributaries::Tributary;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 4, d).unwrap()
    }

    fn measurement(date: NaiveDate, tributary: Tributary) -> Measurement {
        Measurement {
            date,
            tributary,
            total_nitrogen: Some(1.0),
            nitrate: Some(0.5),
            ammonium: Some(0.1),
            organic_nitrogen: Some(0.4),
        }
    }

    fn series(days: std::ops::RangeInclusive<u32>) -> RainfallSeries {
        let records: Vec<RainfallRecord> = days
            .map(|d| RainfallRecord { date: day(d), precipitation_mm: Some(d as f64) })
            .collect();
        RainfallSeries::from_records(&records).unwrap()
    }

    #[test]
    fn test_unmatched_date_keeps_row_with_missing_rainfall() {
        let s = series(1..=10);
        let index = RainfallIndex::build(&s.derive_features());
        let measurements = vec![
            measurement(day(8), Tributary::LewisCreek),
            measurement(day(20), Tributary::OtterCreek),
        ];

        let joined = join_measurements(&measurements, &index);
        assert_eq!(joined.len(), 2);
        assert!(joined[0].rainfall.is_some());
        assert_eq!(joined[1].rainfall, None);
        assert_eq!(joined[1].measurement, measurements[1]);
    }

    #[test]
    fn test_shared_date_matches_same_rainfall_row() {
        let s = series(1..=10);
        let index = RainfallIndex::build(&s.derive_features());
        let measurements = vec![
            measurement(day(7), Tributary::LewisCreek),
            measurement(day(7), Tributary::LaPlatteRiver),
            measurement(day(7), Tributary::OtterCreek),
        ];

        let joined = join_measurements(&measurements, &index);
        let first = joined[0].rainfall.unwrap();
        assert!(joined.iter().all(|j| j.rainfall == Some(first)));
        // days 2..6 → 6+5+4+3+2
        assert_eq!(first.sum_five, Some(20.0));
        assert_eq!(first.date, day(7));
    }

    #[test]
    fn test_index_keeps_first_entry_per_date() {
        let s = series(1..=3);
        let mut features = s.derive_features();
        let mut dup = features[1];
        dup.precipitation_mm = Some(99.0);
        features.push(dup);

        let index = RainfallIndex::build(&features);
        assert_eq!(index.date_count(), 3);
        assert_eq!(index.lookup(day(2)).unwrap().precipitation_mm, Some(2.0));
    }

    #[test]
    fn test_coverage_counts_zero_filled_and_unmatched() {
        let s = series(1..=20);
        let measurements = vec![
            measurement(day(3), Tributary::LewisCreek),  // inside 5-day head
            measurement(day(6), Tributary::LewisCreek),  // full window (days 1..5)
            measurement(day(15), Tributary::OtterCreek),
            measurement(day(25), Tributary::OtterCreek), // after series end
        ];

        let report = check_coverage(&s, &measurements, 5, false).unwrap();
        assert_eq!(report.zero_filled, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.first_measurement, Some(day(3)));
        assert_eq!(report.last_measurement, Some(day(25)));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_strict_coverage_rejects_zero_filled_measurements() {
        let s = series(1..=20);
        let measurements = vec![measurement(day(2), Tributary::LewisCreek)];
        match check_coverage(&s, &measurements, 5, true) {
            Err(AnalysisError::InsufficientRainfallHistory { rainfall_start, affected }) => {
                assert_eq!(rainfall_start, day(1));
                assert_eq!(affected, 1);
            }
            other => panic!("expected InsufficientRainfallHistory, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_coverage_passes_when_history_is_long_enough() {
        let s = series(1..=20);
        let measurements = vec![measurement(day(6), Tributary::LewisCreek)];
        let report = check_coverage(&s, &measurements, 5, true).unwrap();
        assert!(report.is_complete());
    }
}
