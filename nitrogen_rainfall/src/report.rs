/// Console tables and JSON export of an `AnalysisReport`.
///
/// The console form is for reading; the JSON form carries every number
/// (including per-observation diagnostics and ternary points) for
/// downstream plotting.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::analysis::regression::FitChoice;
use crate::logging::{self, Stage};
use crate::model::AnalysisError;
use crate::pipeline::AnalysisReport;

const RULE: &str = "═══════════════════════════════════════════════════════════";

fn opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Tributary nitrogen vs. antecedent rainfall")?;
        writeln!(f, "{}", RULE)?;
        writeln!(
            f,
            "Samples: {}   Rainfall days: {} ({} to {})",
            self.measurement_count, self.rainfall_days, self.coverage.rainfall_start, self.coverage.rainfall_end
        )?;
        if self.rainfall_unreported_days > 0 {
            writeln!(
                f,
                "⚠ {} rainfall day(s) unreported; windows covering them are missing",
                self.rainfall_unreported_days
            )?;
        }
        if !self.coverage.is_complete() {
            writeln!(
                f,
                "⚠ {} sample(s) with zero-filled {}-day window, {} outside the rainfall record",
                self.coverage.zero_filled, self.coverage.window_days, self.coverage.unmatched
            )?;
        }

        writeln!(f, "\nConcentrations (mg/L)")?;
        writeln!(
            f,
            "{:<5} {:<4} {:>5} {:>5} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "site", "sp", "n", "miss", "min", "median", "mean", "max", "mad"
        )?;
        for s in &self.summaries {
            writeln!(
                f,
                "{:<5} {:<4} {:>5} {:>5} {:>8} {:>8} {:>8} {:>8} {:>8}",
                s.tributary.code(),
                s.species.label(),
                s.count,
                s.missing,
                opt(s.min, 3),
                opt(s.median, 3),
                opt(s.mean, 3),
                opt(s.max, 3),
                opt(s.mad, 3)
            )?;
        }

        writeln!(f, "\nMean composition (fraction of NO3 + NH4 + ON)")?;
        writeln!(f, "{:<5} {:>5} {:>7} {:>7} {:>7}", "site", "n", "NO3", "NH4", "ON")?;
        for c in &self.composition {
            writeln!(
                f,
                "{:<5} {:>5} {:>7.3} {:>7.3} {:>7.3}",
                c.tributary.code(),
                c.n,
                c.mean_nitrate,
                c.mean_ammonium,
                c.mean_organic
            )?;
        }

        for matrix in &self.correlation_matrices {
            writeln!(f, "\nSpearman rho across tributaries: {}", matrix.species)?;
            write!(f, "{:<5}", "")?;
            for t in &matrix.tributaries {
                write!(f, " {:>12}", t.code())?;
            }
            writeln!(f)?;
            for (i, row) in matrix.coefficients.iter().enumerate() {
                write!(f, "{:<5}", matrix.tributaries[i].code())?;
                for (j, cell) in row.iter().enumerate() {
                    let cell = format!("{} (n={})", opt(*cell, 2), matrix.pair_counts[i][j]);
                    write!(f, " {:>12}", cell)?;
                }
                writeln!(f)?;
            }
        }

        if !self.comparisons.is_empty() {
            writeln!(f, "\nTwo-site significance")?;
            for c in &self.comparisons {
                writeln!(
                    f,
                    "  {:<4} {}–{}: {} = {:.3}, p = {:.4} (n={})",
                    c.species.label(),
                    c.first.code(),
                    c.second.code(),
                    c.test.method,
                    c.test.coefficient,
                    c.test.p_value,
                    c.test.n
                )?;
            }
        }

        writeln!(f, "\nSpearman rho, concentration vs. antecedent rainfall")?;
        for (r, test) in self.rainfall_correlations.iter().filter_map(|r| r.test.map(|t| (r, t))) {
            let marker = if test.p_value < 0.05 { "*" } else { "" };
            writeln!(
                f,
                "  {:<4} {:<4} {:<5} rho = {:>6.3}, p = {:.4} (n={}){}",
                r.tributary.code(),
                r.species.label(),
                r.feature.label(),
                test.coefficient,
                test.p_value,
                test.n,
                marker
            )?;
        }

        for reg in &self.regressions {
            writeln!(
                f,
                "\nln({}) ~ ln(1 + {}) at {}: n = {}, excluded = {}",
                reg.species,
                reg.feature.label(),
                reg.tributary,
                reg.n,
                reg.excluded.total()
            )?;
            let ols = &reg.ordinary;
            writeln!(
                f,
                "  OLS        slope = {:.4} ± {:.4}, intercept = {:.4}, R² = {:.3}, p = {:.4}",
                ols.slope, ols.slope_std_error, ols.intercept, ols.r_squared, ols.slope_p_value
            )?;
            let ts = &reg.robust;
            writeln!(
                f,
                "  Theil-Sen  slope = {:.4} [{:.4}, {:.4}], intercept = {:.4}",
                ts.slope, ts.slope_ci_low, ts.slope_ci_high, ts.intercept
            )?;
            let preferred = match reg.preferred {
                FitChoice::Ordinary => "OLS",
                FitChoice::Robust => "Theil-Sen",
            };
            writeln!(
                f,
                "  {} outlier(s), {} high-leverage point(s), {} influential → {} (slope {:.4})",
                reg.outlier_dates.len(),
                reg.high_leverage_dates.len(),
                reg.influential_dates.len(),
                preferred,
                reg.preferred_slope()
            )?;
        }

        writeln!(f, "{}", RULE)
    }
}

/// Write the full report as pretty-printed JSON.
pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<(), AnalysisError> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    logging::info(Stage::Report, Some(&path.display().to_string()), "Wrote JSON report");
    Ok(())
}
