/// Input loaders for the two tabular sources.
///
/// Submodules:
/// - `chemistry`: tributary water-chemistry sheet (CSV export).
/// - `rainfall`: daily precipitation in GHCN-Daily layout.
///
/// Helpers shared by both loaders (date and missing-value parsing) live
/// here.

pub mod chemistry;
pub mod rainfall;

use chrono::{NaiveDate, NaiveDateTime};

/// Cell values the input files use to mean "no value".
const MISSING_SENTINELS: &[&str] = &["", "na", "n/a", "nan", "nd", "-", "null"];

/// Returns `true` if a raw cell is one of the missing-value sentinels.
pub(crate) fn is_missing_sentinel(raw: &str) -> bool {
    let trimmed = raw.trim().to_ascii_lowercase();
    MISSING_SENTINELS.contains(&trimmed.as_str())
}

/// Parses a calendar date in any of the formats seen in the inputs.
///
/// Accepts `2019-04-02`, `20190402`, `04/02/2019` and spreadsheet-exported
/// timestamps (`2019-04-02 00:00:00`, `2019-04-02 13:45`); the time part
/// is dropped.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}
