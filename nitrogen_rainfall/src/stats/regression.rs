//! Simple linear regression: ordinary least squares and Theil–Sen.
//!
//! ## Design notes
//!
//! * **OLS** reports the usual slope inference (standard error, t, p) and
//!   per-observation influence diagnostics: leverage, internally
//!   studentized residuals and Cook's distance.
//! * **Theil–Sen** takes the median of all pairwise slopes and is the
//!   robust alternative when the OLS diagnostics flag outliers or
//!   high-leverage points.
//! * Degenerate input (too few points, no spread in x) is an error, never
//!   a NaN result.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::model::AnalysisError;
use crate::stats::correlation::two_sided_t;
use crate::stats::ranks::{median, tie_group_sizes};

/// Smallest sample a regression is fitted to (leaves one residual df).
pub const MIN_FIT_POINTS: usize = 3;

/// Number of fitted parameters (intercept and slope).
const PARAMS: f64 = 2.0;

/// Below this, 1 − h is treated as zero: the fit passes through the point
/// whatever its y, so its residual carries no information.
const FULL_LEVERAGE_TOLERANCE: f64 = 1e-10;

// ============================================================================
// Ordinary least squares
// ============================================================================

/// Per-observation diagnostics of an OLS fit, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Hat-matrix diagonal, h_i = 1/n + (x_i − x̄)² / Sxx.
    pub leverage: Vec<f64>,
    /// Residual divided by s·√(1 − h_i). `None` where h_i is 1.
    pub studentized_residuals: Vec<Option<f64>>,
    /// `None` where h_i is 1.
    pub cooks_distance: Vec<Option<f64>>,
}

impl FitDiagnostics {
    /// Indices whose |studentized residual| exceeds `threshold`.
    /// Points with an undefined residual are never outliers.
    pub fn outliers(&self, threshold: f64) -> Vec<usize> {
        self.studentized_residuals
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_some_and(|r| r.abs() > threshold))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices whose leverage exceeds `multiplier` times the mean
    /// leverage p/n.
    pub fn high_leverage(&self, multiplier: f64) -> Vec<usize> {
        let n = self.leverage.len() as f64;
        let cutoff = multiplier * PARAMS / n;
        self.leverage
            .iter()
            .enumerate()
            .filter(|(_, h)| **h > cutoff)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices with Cook's distance above the conventional 4/n cut.
    pub fn influential(&self) -> Vec<usize> {
        let cutoff = 4.0 / self.cooks_distance.len() as f64;
        self.cooks_distance
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_some_and(|d| d > cutoff))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Result of a simple OLS fit `y = intercept + slope·x`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub slope_std_error: f64,
    pub slope_t: f64,
    pub slope_p_value: f64,
    pub r_squared: f64,
    pub residual_std_error: f64,
    pub n: usize,
    pub diagnostics: FitDiagnostics,
}

fn check_inputs(x: &[f64], y: &[f64]) -> Result<(), AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::DegenerateFit(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < MIN_FIT_POINTS {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_FIT_POINTS,
            got: x.len(),
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::DegenerateFit("non-finite value in regression input".to_string()));
    }
    Ok(())
}

/// Fit `y` on `x` by ordinary least squares.
pub fn ols(x: &[f64], y: &[f64]) -> Result<LinearFit, AnalysisError> {
    check_inputs(x, y)?;

    let n = x.len();
    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mean_x) * (yi - mean_y)).sum();
    let sst: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();

    if sxx <= 0.0 {
        return Err(AnalysisError::DegenerateFit("all x values are identical".to_string()));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let fitted: Vec<f64> = x.iter().map(|xi| intercept + slope * xi).collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    let sse: f64 = residuals.iter().map(|e| e * e).sum();

    let df = nf - PARAMS;
    let residual_std_error = (sse / df).sqrt();
    let leverage: Vec<f64> = x.iter().map(|xi| 1.0 / nf + (xi - mean_x).powi(2) / sxx).collect();

    // Residuals at rounding-noise level are an exact fit; dividing by them
    // would turn noise into spurious outliers.
    let y_scale = y.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let exact = residual_std_error <= 1e-12 * y_scale;

    let (studentized_residuals, cooks_distance): (Vec<Option<f64>>, Vec<Option<f64>>) = residuals
        .iter()
        .zip(&leverage)
        .map(|(e, h)| {
            let free = 1.0 - h;
            if free <= FULL_LEVERAGE_TOLERANCE {
                (None, None)
            } else if exact {
                (Some(0.0), Some(0.0))
            } else {
                let r = e / (residual_std_error * free.sqrt());
                (Some(r), Some(r * r * h / (PARAMS * free)))
            }
        })
        .unzip();

    let (slope_std_error, slope_t, slope_p_value) = if exact {
        (0.0, f64::INFINITY, 0.0)
    } else {
        let se = residual_std_error / sxx.sqrt();
        let t = slope / se;
        (se, t, two_sided_t(t, df)?)
    };

    let r_squared = if sst > 0.0 { (1.0 - sse / sst).clamp(0.0, 1.0) } else { 0.0 };

    Ok(LinearFit {
        intercept,
        slope,
        slope_std_error,
        slope_t,
        slope_p_value,
        r_squared,
        residual_std_error,
        n,
        diagnostics: FitDiagnostics {
            fitted,
            residuals,
            leverage,
            studentized_residuals,
            cooks_distance,
        },
    })
}

// ============================================================================
// Theil–Sen
// ============================================================================

/// Result of a Theil–Sen fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustFit {
    pub intercept: f64,
    /// Median of the pairwise slopes.
    pub slope: f64,
    /// 95% confidence interval for the slope (Sen's method).
    pub slope_ci_low: f64,
    pub slope_ci_high: f64,
    pub n: usize,
    /// Pairwise slopes the median was taken over (pairs with equal x are
    /// skipped).
    pub pair_count: usize,
}

/// Two-sided confidence level of the reported slope interval.
pub const THEIL_SEN_CONFIDENCE: f64 = 0.95;

/// Fit `y` on `x` by the Theil–Sen median-slope estimator.
///
/// The intercept is the median of `y − slope·x`.
pub fn theil_sen(x: &[f64], y: &[f64]) -> Result<RobustFit, AnalysisError> {
    check_inputs(x, y)?;
    let n = x.len();

    let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[j] - x[i];
            if dx != 0.0 {
                slopes.push((y[j] - y[i]) / dx);
            }
        }
    }
    if slopes.is_empty() {
        return Err(AnalysisError::DegenerateFit("all x values are identical".to_string()));
    }
    slopes.sort_by(f64::total_cmp);

    let slope = median(&slopes).unwrap_or(0.0);
    let offsets: Vec<f64> = x.iter().zip(y).map(|(xi, yi)| yi - slope * xi).collect();
    let intercept = median(&offsets).unwrap_or(0.0);

    let (slope_ci_low, slope_ci_high) = sen_interval(&slopes, x, y)?;

    Ok(RobustFit {
        intercept,
        slope,
        slope_ci_low,
        slope_ci_high,
        n,
        pair_count: slopes.len(),
    })
}

/// Sen's distribution-free confidence interval, read off the sorted slopes
/// at ranks offset by z·σ of Kendall's S (tie-corrected).
fn sen_interval(sorted_slopes: &[f64], x: &[f64], y: &[f64]) -> Result<(f64, f64), AnalysisError> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AnalysisError::DegenerateFit(format!("standard normal: {}", e)))?;
    let z = normal.inverse_cdf(0.5 + THEIL_SEN_CONFIDENCE / 2.0);

    let nf = x.len() as f64;
    let tie_term = |values: &[f64]| -> f64 {
        tie_group_sizes(values)
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * (t - 1.0) * (2.0 * t + 5.0)
            })
            .sum()
    };
    let var_s = (nf * (nf - 1.0) * (2.0 * nf + 5.0) - tie_term(x) - tie_term(y)) / 18.0;
    let sigma = var_s.max(0.0).sqrt();

    let count = sorted_slopes.len();
    let last = count - 1;
    let half_width = z * sigma;
    let low_rank = ((count as f64 - half_width) / 2.0).round() - 1.0;
    let high_rank = ((count as f64 + half_width) / 2.0).round();

    let low_idx = (low_rank.max(0.0) as usize).min(last);
    let high_idx = (high_rank.max(0.0) as usize).min(last);
    Ok((sorted_slopes[low_idx], sorted_slopes[high_idx]))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_ols_recovers_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 1.5 + 0.5 * v).collect();
        let fit = ols(&x, &y).unwrap();
        assert!(close(fit.slope, 0.5, 1e-12));
        assert!(close(fit.intercept, 1.5, 1e-12));
        assert!(close(fit.r_squared, 1.0, 1e-12));
        assert_eq!(fit.slope_p_value, 0.0);
        assert!(fit.diagnostics.outliers(2.0).is_empty());
        assert!(fit.diagnostics.studentized_residuals.iter().all(|r| *r == Some(0.0)));
    }

    #[test]
    fn test_ols_textbook_example() {
        // y = [1, 3, 2, 5, 4] on x = 1..5:
        // Sxx = 10, Sxy = 8 → slope 0.8, intercept 0.6, SSE = 3.6, SST = 10
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = ols(&x, &y).unwrap();
        assert!(close(fit.slope, 0.8, 1e-12));
        assert!(close(fit.intercept, 0.6, 1e-12));
        assert!(close(fit.r_squared, 0.64, 1e-12));
        let s = (3.6_f64 / 3.0).sqrt();
        assert!(close(fit.residual_std_error, s, 1e-12));
        assert!(close(fit.slope_std_error, s / 10f64.sqrt(), 1e-12));
        // t ≈ 2.309 on 3 df → p ≈ 0.104
        assert!(close(fit.slope_p_value, 0.104, 2e-3), "p = {}", fit.slope_p_value);
    }

    #[test]
    fn test_leverage_sums_to_parameter_count() {
        let x = [1.0, 2.0, 4.0, 8.0, 16.0];
        let y = [2.0, 1.0, 5.0, 7.0, 20.0];
        let fit = ols(&x, &y).unwrap();
        let total: f64 = fit.diagnostics.leverage.iter().sum();
        assert!(close(total, 2.0, 1e-12));
        // the far-right x carries the most leverage
        assert_eq!(fit.diagnostics.high_leverage(1.5), vec![4]);
    }

    #[test]
    fn test_outlier_is_flagged_by_studentized_residual() {
        let x: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let mut y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0 + if (*v as i32) % 2 == 0 { 0.1 } else { -0.1 }).collect();
        y[5] += 8.0;
        let fit = ols(&x, &y).unwrap();
        assert_eq!(fit.diagnostics.outliers(2.0), vec![5]);
        assert!(fit.diagnostics.influential().contains(&5));
    }

    #[test]
    fn test_full_leverage_point_has_undefined_residual_and_is_not_an_outlier() {
        // four dry days and one wet one: the line must pass through the wet day
        let x: Vec<f64> = [0.0_f64, 0.0, 0.0, 0.0, 12.0].iter().map(|r| r.ln_1p()).collect();
        let y = [0.1, -0.2, 0.15, -0.05, 0.9];
        let fit = ols(&x, &y).unwrap();
        let d = &fit.diagnostics;

        assert!(close(d.leverage[4], 1.0, 1e-12));
        assert!(close(d.residuals[4], 0.0, 1e-12));
        assert_eq!(d.studentized_residuals[4], None);
        assert_eq!(d.cooks_distance[4], None);
        assert!(d.studentized_residuals[..4].iter().all(|r| r.is_some_and(f64::is_finite)));

        assert!(!d.outliers(2.0).contains(&4));
        assert!(!d.influential().contains(&4));
        assert_eq!(d.high_leverage(2.0), vec![4]);

        // undefined values serialize as null, never as a bogus number
        let json = serde_json::to_value(d).unwrap();
        assert!(json["cooks_distance"][4].is_null());
    }

    #[test]
    fn test_ols_rejects_degenerate_input() {
        assert!(matches!(
            ols(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::DegenerateFit(_))
        ));
        assert!(matches!(
            ols(&[1.0, 2.0], &[1.0, 2.0]),
            Err(AnalysisError::InsufficientData { needed: 3, got: 2 })
        ));
        assert!(matches!(
            ols(&[1.0, 2.0, f64::NAN], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::DegenerateFit(_))
        ));
    }

    #[test]
    fn test_theil_sen_ignores_single_gross_outlier() {
        let x: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let mut y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        y[9] = 100.0;

        let robust = theil_sen(&x, &y).unwrap();
        assert!(close(robust.slope, 2.0, 1e-12));
        assert!(close(robust.intercept, 1.0, 1e-12));
        assert_eq!(robust.pair_count, 45);
        assert!(robust.slope_ci_low <= robust.slope && robust.slope <= robust.slope_ci_high);

        let ordinary = ols(&x, &y).unwrap();
        assert!(ordinary.slope > 4.0, "OLS should be pulled by the outlier");
    }

    #[test]
    fn test_theil_sen_interval_brackets_noisy_slope() {
        let x: Vec<f64> = (0..20).map(|v| v as f64).collect();
        let noise = [0.3, -0.2, 0.1, -0.4, 0.2, 0.0, -0.1, 0.4, -0.3, 0.1];
        let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 0.7 * v + noise[i % noise.len()]).collect();
        let fit = theil_sen(&x, &y).unwrap();
        assert!(fit.slope_ci_low < 0.7 && 0.7 < fit.slope_ci_high);
        assert!(fit.slope_ci_high - fit.slope_ci_low < 0.2);
    }

    #[test]
    fn test_theil_sen_skips_vertical_pairs() {
        let x = [1.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let fit = theil_sen(&x, &y).unwrap();
        assert_eq!(fit.pair_count, 5);
    }

    #[test]
    fn test_theil_sen_rejects_constant_x() {
        assert!(matches!(
            theil_sen(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::DegenerateFit(_))
        ));
    }
}
