//! Statistical primitives used by the analysis.
//!
//! - `ranks`: tie-averaged ranks, median, MAD.
//! - `correlation`: Pearson, Spearman and Kendall tau-b with p-values.
//! - `regression`: ordinary least squares with influence diagnostics and
//!   the Theil–Sen median-slope estimator.
//!
//! Functions here take plain, already paired slices. Dropping missing
//! values is the caller's job (see `paired_complete`).

pub mod correlation;
pub mod ranks;
pub mod regression;

/// Keep only the positions where both series have a finite value.
pub fn paired_complete<I>(pairs: I) -> (Vec<f64>, Vec<f64>)
where
    I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
{
    pairs
        .into_iter()
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        })
        .unzip()
}
