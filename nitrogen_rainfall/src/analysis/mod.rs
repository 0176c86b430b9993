/// Analysis steps run over the joined chemistry/rainfall records.
///
/// Submodules:
/// - `series`: pivots joined records into per-tributary date-keyed series.
/// - `correlation`: cross-tributary Spearman matrices, two-site
///   significance tests, concentration-vs-rainfall correlations.
/// - `regression`: log concentration against log antecedent rainfall,
///   ordinary and robust.
/// - `composition`: nitrate / ammonium / organic N fractions (ternary).
/// - `summary`: per-site descriptive statistics.

pub mod composition;
pub mod correlation;
pub mod regression;
pub mod series;
pub mod summary;
