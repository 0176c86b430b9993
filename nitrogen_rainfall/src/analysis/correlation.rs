/// Rank correlations between tributaries and against antecedent rainfall.
///
/// All statistics are pairwise-complete: each pair of series uses the
/// dates on which both have a value.

use serde::Serialize;

use crate::analysis::series::SpeciesSeries;
use crate::model::{AnalysisError, JoinedRecord, NitrogenSpecies, RainfallFeature};
use crate::stats::correlation::{
    CorrelationMethod, CorrelationTest, MIN_TEST_PAIRS, correlation_test, spearman, spearman_test,
};
use crate::stats::paired_complete;
use crate::tributaries::Tributary;

// ---------------------------------------------------------------------------
// Cross-tributary matrix
// ---------------------------------------------------------------------------

/// Spearman correlation of one species between every pair of tributaries.
///
/// Rows and columns follow `tributaries`. The diagonal is 1; an
/// off-diagonal cell is `None` when the pair shares fewer than
/// `MIN_TEST_PAIRS` dates or one side is constant over them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub species: NitrogenSpecies,
    pub tributaries: Vec<Tributary>,
    pub coefficients: Vec<Vec<Option<f64>>>,
    /// Shared dates per pair; the diagonal holds each site's sample count.
    pub pair_counts: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Tributary, b: Tributary) -> Option<f64> {
        let i = self.tributaries.iter().position(|t| *t == a)?;
        let j = self.tributaries.iter().position(|t| *t == b)?;
        self.coefficients[i][j]
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.tributaries.len();
        (0..n).all(|i| (0..n).all(|j| self.coefficients[i][j] == self.coefficients[j][i]))
    }
}

/// Build the cross-tributary Spearman matrix for `species`.
pub fn cross_tributary_matrix(records: &[JoinedRecord], species: NitrogenSpecies) -> CorrelationMatrix {
    let series = SpeciesSeries::pivot(records, species);
    let tributaries = Tributary::ALL.to_vec();
    let n = tributaries.len();

    let mut coefficients = vec![vec![None; n]; n];
    let mut pair_counts = vec![vec![0; n]; n];

    for i in 0..n {
        coefficients[i][i] = Some(1.0);
        pair_counts[i][i] = series.get(tributaries[i]).len();
        for j in (i + 1)..n {
            let (a, b) = series.paired(tributaries[i], tributaries[j]);
            let rho = if a.len() >= MIN_TEST_PAIRS { spearman(&a, &b) } else { None };
            coefficients[i][j] = rho;
            coefficients[j][i] = rho;
            pair_counts[i][j] = a.len();
            pair_counts[j][i] = a.len();
        }
    }

    CorrelationMatrix {
        species,
        tributaries,
        coefficients,
        pair_counts,
    }
}

// ---------------------------------------------------------------------------
// Two-site significance
// ---------------------------------------------------------------------------

/// Significance test of one species between two tributaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TributaryComparison {
    pub species: NitrogenSpecies,
    pub first: Tributary,
    pub second: Tributary,
    pub test: CorrelationTest,
}

/// Test whether two tributaries' concentrations of `species` move together.
pub fn compare_tributaries(
    records: &[JoinedRecord],
    species: NitrogenSpecies,
    first: Tributary,
    second: Tributary,
    method: CorrelationMethod,
) -> Result<TributaryComparison, AnalysisError> {
    let series = SpeciesSeries::pivot(records, species);
    let (a, b) = series.paired(first, second);
    let test = correlation_test(method, &a, &b)?;
    Ok(TributaryComparison {
        species,
        first,
        second,
        test,
    })
}

// ---------------------------------------------------------------------------
// Concentration vs. rainfall
// ---------------------------------------------------------------------------

/// Spearman correlation of one site's concentration with a rainfall feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallCorrelation {
    pub tributary: Tributary,
    pub species: NitrogenSpecies,
    pub feature: RainfallFeature,
    /// Complete (concentration, rainfall) pairs available.
    pub n: usize,
    /// `None` when the pairs are too few or constant.
    pub test: Option<CorrelationTest>,
}

/// Correlate every species at every site with every rainfall feature.
pub fn rainfall_correlations(records: &[JoinedRecord]) -> Vec<RainfallCorrelation> {
    let mut out = Vec::new();
    for tributary in Tributary::ALL {
        let site: Vec<&JoinedRecord> = records
            .iter()
            .filter(|r| r.measurement.tributary == tributary)
            .collect();
        for species in NitrogenSpecies::ALL {
            for feature in RainfallFeature::ALL {
                let (conc, rain) = paired_complete(
                    site.iter()
                        .map(|r| (species.value(&r.measurement), r.feature(feature))),
                );
                out.push(RainfallCorrelation {
                    tributary,
                    species,
                    feature,
                    n: conc.len(),
                    test: spearman_test(&conc, &rain).ok(),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DerivedRainfallFeatures, Measurement};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, d).unwrap()
    }

    fn record(d: u32, tributary: Tributary, nitrate: Option<f64>, sum_five: Option<f64>) -> JoinedRecord {
        JoinedRecord {
            measurement: Measurement {
                date: day(d),
                tributary,
                total_nitrogen: None,
                nitrate,
                ammonium: None,
                organic_nitrogen: None,
            },
            rainfall: sum_five.map(|s| DerivedRainfallFeatures {
                date: day(d),
                precipitation_mm: Some(0.0),
                lag_one: Some(s / 5.0),
                sum_three: Some(s / 2.0),
                sum_five: Some(s),
            }),
        }
    }

    fn fixture() -> Vec<JoinedRecord> {
        let lew = [0.4, 0.9, 0.5, 1.3, 0.8, 1.1];
        let lap = [1.0, 2.2, 1.4, 2.9, 1.9, 2.5]; // same ordering as lew
        let ott = [0.9, 0.3, 0.8, 0.2, 0.5, 0.4]; // roughly reversed
        let mut records = Vec::new();
        for i in 0..6 {
            let d = i as u32 + 1;
            records.push(record(d, Tributary::LewisCreek, Some(lew[i]), Some(lew[i] * 10.0)));
            records.push(record(d, Tributary::LaPlatteRiver, Some(lap[i]), None));
            records.push(record(d, Tributary::OtterCreek, Some(ott[i]), Some(3.0)));
        }
        records
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let matrix = cross_tributary_matrix(&fixture(), NitrogenSpecies::Nitrate);
        assert!(matrix.is_symmetric());
        for t in Tributary::ALL {
            assert_eq!(matrix.get(t, t), Some(1.0));
        }
        let rho = matrix.get(Tributary::LewisCreek, Tributary::LaPlatteRiver).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
        assert!(matrix.get(Tributary::LewisCreek, Tributary::OtterCreek).unwrap() < -0.8);
        assert_eq!(matrix.pair_counts[0][1], 6);
    }

    #[test]
    fn test_matrix_cell_is_none_without_enough_shared_dates() {
        let records = vec![
            record(1, Tributary::LewisCreek, Some(1.0), None),
            record(2, Tributary::LewisCreek, Some(2.0), None),
            record(3, Tributary::LewisCreek, Some(3.0), None),
            record(3, Tributary::OtterCreek, Some(1.0), None),
            record(4, Tributary::OtterCreek, Some(2.0), None),
        ];
        let matrix = cross_tributary_matrix(&records, NitrogenSpecies::Nitrate);
        assert_eq!(matrix.get(Tributary::LewisCreek, Tributary::OtterCreek), None);
        assert_eq!(matrix.pair_counts[0][2], 1);
        assert_eq!(matrix.get(Tributary::LaPlatteRiver, Tributary::LaPlatteRiver), Some(1.0));
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_compare_tributaries_kendall() {
        let cmp = compare_tributaries(
            &fixture(),
            NitrogenSpecies::Nitrate,
            Tributary::LewisCreek,
            Tributary::LaPlatteRiver,
            CorrelationMethod::Kendall,
        )
        .unwrap();
        assert_eq!(cmp.test.method, CorrelationMethod::Kendall);
        assert!((cmp.test.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(cmp.test.n, 6);
    }

    #[test]
    fn test_compare_tributaries_without_overlap_fails() {
        let cmp = compare_tributaries(
            &fixture(),
            NitrogenSpecies::Ammonium,
            Tributary::LewisCreek,
            Tributary::OtterCreek,
            CorrelationMethod::Spearman,
        );
        assert!(matches!(cmp, Err(AnalysisError::InsufficientData { .. })));
    }

    #[test]
    fn test_rainfall_correlations_cover_every_combination() {
        let results = rainfall_correlations(&fixture());
        assert_eq!(results.len(), 3 * 4 * 3);

        let lew = results
            .iter()
            .find(|r| {
                r.tributary == Tributary::LewisCreek
                    && r.species == NitrogenSpecies::Nitrate
                    && r.feature == RainfallFeature::SumFive
            })
            .unwrap();
        assert_eq!(lew.n, 6);
        assert!((lew.test.unwrap().coefficient - 1.0).abs() < 1e-12);

        // LaPlatte has no rainfall match at all
        let lap = results
            .iter()
            .find(|r| r.tributary == Tributary::LaPlatteRiver && r.species == NitrogenSpecies::Nitrate)
            .unwrap();
        assert_eq!(lap.n, 0);
        assert!(lap.test.is_none());

        // Otter's rainfall is constant, so the test is undefined
        let ott = results
            .iter()
            .find(|r| r.tributary == Tributary::OtterCreek && r.species == NitrogenSpecies::Nitrate)
            .unwrap();
        assert_eq!(ott.n, 6);
        assert!(ott.test.is_none());
    }
}
