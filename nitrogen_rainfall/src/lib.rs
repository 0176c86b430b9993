//! Tributary nitrogen vs. antecedent rainfall analysis.
//!
//! Loads a tributary water-chemistry export and a daily rainfall record,
//! derives antecedent rainfall windows, joins them to samples by date, and
//! runs the correlation and regression analyses.

pub mod analysis;
pub mod config;
pub mod features;
pub mod ingest;
pub mod join;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod tributaries;
