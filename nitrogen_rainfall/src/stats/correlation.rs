//! Correlation coefficients and significance tests.
//!
//! Coefficient-only functions return `None` when the statistic is undefined
//! (fewer than two pairs, or a constant series) so that matrix builders can
//! leave a cell empty. The `*_test` functions are used where a result is
//! required and return an error instead.
//!
//! P-values are two-sided and asymptotic: Student's t with n − 2 degrees of
//! freedom for Spearman, the tie-corrected normal approximation for Kendall
//! tau-b.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::model::AnalysisError;
use crate::stats::ranks::{average_ranks, tie_group_sizes};

/// Smallest sample a significance test is run on.
pub const MIN_TEST_PAIRS: usize = 3;

/// Rank correlation used for a significance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    Spearman,
    Kendall,
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationMethod::Spearman => write!(f, "Spearman rho"),
            CorrelationMethod::Kendall => write!(f, "Kendall tau-b"),
        }
    }
}

/// Outcome of a correlation significance test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationTest {
    pub method: CorrelationMethod,
    pub coefficient: f64,
    /// Two-sided p-value for H0: no monotone association.
    pub p_value: f64,
    /// Number of complete pairs used.
    pub n: usize,
}

/// Run the chosen rank test.
pub fn correlation_test(method: CorrelationMethod, x: &[f64], y: &[f64]) -> Result<CorrelationTest, AnalysisError> {
    match method {
        CorrelationMethod::Spearman => spearman_test(x, y),
        CorrelationMethod::Kendall => kendall_test(x, y),
    }
}

// ---------------------------------------------------------------------------
// Coefficients
// ---------------------------------------------------------------------------

/// Pearson product-moment correlation.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        num += dx * dy;
        ss_x += dx * dx;
        ss_y += dy * dy;
    }

    let denom = (ss_x * ss_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((num / denom).clamp(-1.0, 1.0))
}

/// Spearman rank correlation: Pearson on tie-averaged ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

// ---------------------------------------------------------------------------
// Significance tests
// ---------------------------------------------------------------------------

fn check_pairs(x: &[f64], y: &[f64]) -> Result<(), AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::InsufficientData {
            needed: x.len().max(y.len()),
            got: x.len().min(y.len()),
        });
    }
    if x.len() < MIN_TEST_PAIRS {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_TEST_PAIRS,
            got: x.len(),
        });
    }
    Ok(())
}

/// Spearman rho with a t-approximation p-value.
pub fn spearman_test(x: &[f64], y: &[f64]) -> Result<CorrelationTest, AnalysisError> {
    check_pairs(x, y)?;
    let rho = spearman(x, y).ok_or_else(|| {
        AnalysisError::DegenerateFit("Spearman correlation undefined for a constant series".to_string())
    })?;

    let n = x.len();
    let p_value = if rho.abs() >= 1.0 {
        0.0
    } else {
        let df = (n - 2) as f64;
        let t = rho * (df / (1.0 - rho * rho)).sqrt();
        two_sided_t(t, df)?
    };

    Ok(CorrelationTest {
        method: CorrelationMethod::Spearman,
        coefficient: rho,
        p_value,
        n,
    })
}

/// Kendall tau-b with the tie-corrected normal approximation.
pub fn kendall_test(x: &[f64], y: &[f64]) -> Result<CorrelationTest, AnalysisError> {
    check_pairs(x, y)?;
    let n = x.len();

    let mut concordant: i64 = 0;
    let mut discordant: i64 = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            // A tie on either side counts for neither.
            if x[i] == x[j] || y[i] == y[j] {
                continue;
            }
            if (x[i] < x[j]) == (y[i] < y[j]) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let ties_x = tie_group_sizes(x);
    let ties_y = tie_group_sizes(y);
    let pair_sum = |sizes: &[usize], f: &dyn Fn(f64) -> f64| -> f64 {
        sizes.iter().map(|&t| f(t as f64)).sum()
    };

    let nf = n as f64;
    let n0 = nf * (nf - 1.0) / 2.0;
    let n1 = pair_sum(&ties_x, &|t| t * (t - 1.0) / 2.0);
    let n2 = pair_sum(&ties_y, &|t| t * (t - 1.0) / 2.0);
    let denom = ((n0 - n1) * (n0 - n2)).sqrt();
    if denom == 0.0 {
        return Err(AnalysisError::DegenerateFit(
            "Kendall tau-b undefined for a constant series".to_string(),
        ));
    }

    let s = (concordant - discordant) as f64;
    let tau = (s / denom).clamp(-1.0, 1.0);

    let x0 = pair_sum(&ties_x, &|t| t * (t - 1.0) * (2.0 * t + 5.0));
    let y0 = pair_sum(&ties_y, &|t| t * (t - 1.0) * (2.0 * t + 5.0));
    let x1 = pair_sum(&ties_x, &|t| t * (t - 1.0));
    let y1 = pair_sum(&ties_y, &|t| t * (t - 1.0));
    let x2 = pair_sum(&ties_x, &|t| t * (t - 1.0) * (t - 2.0));
    let y2 = pair_sum(&ties_y, &|t| t * (t - 1.0) * (t - 2.0));

    let var_s = (nf * (nf - 1.0) * (2.0 * nf + 5.0) - x0 - y0) / 18.0
        + x1 * y1 / (2.0 * nf * (nf - 1.0))
        + x2 * y2 / (9.0 * nf * (nf - 1.0) * (nf - 2.0));

    let p_value = if var_s > 0.0 {
        let z = s / var_s.sqrt();
        two_sided_normal(z)?
    } else {
        1.0
    };

    Ok(CorrelationTest {
        method: CorrelationMethod::Kendall,
        coefficient: tau,
        p_value,
        n,
    })
}

// ---------------------------------------------------------------------------
// Reference distributions
// ---------------------------------------------------------------------------

/// Two-sided tail probability of Student's t with `df` degrees of freedom.
pub fn two_sided_t(t: f64, df: f64) -> Result<f64, AnalysisError> {
    if !t.is_finite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::DegenerateFit(format!("t distribution with {} df: {}", df, e)))?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Two-sided tail probability of the standard normal.
pub fn two_sided_normal(z: f64) -> Result<f64, AnalysisError> {
    if !z.is_finite() {
        return Ok(0.0);
    }
    let dist = Normal::new(0.0, 1.0)
        .map_err(|e| AnalysisError::DegenerateFit(format!("standard normal: {}", e)))?;
    Ok((2.0 * dist.sf(z.abs())).clamp(0.0, 1.0))
}
