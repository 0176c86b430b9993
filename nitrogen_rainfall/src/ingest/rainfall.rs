/// Daily rainfall loader
///
/// Reads a GHCN-Daily style CSV (one row per station-day). Only the date
/// and precipitation columns are used; they are located by header name so
/// the station, attribute and temperature columns can come in any order.
///
/// PRCP is recorded in tenths of a millimetre and is converted to mm here,
/// once, so that nothing downstream ever sees tenths. A blank PRCP cell
/// (an unobserved day) is kept as a missing value.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ingest::{is_missing_sentinel, parse_date};
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, RainfallRecord, tenths_to_mm};

/// Header names of the two columns the loader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RainfallColumns {
    pub date: String,
    pub precipitation: String,
}

impl Default for RainfallColumns {
    fn default() -> Self {
        Self {
            date: "DATE".to_string(),
            precipitation: "PRCP".to_string(),
        }
    }
}

/// Load rainfall records from a CSV file on disk.
pub fn load_rainfall(path: &Path, columns: &RainfallColumns) -> Result<Vec<RainfallRecord>, AnalysisError> {
    let file = File::open(path)?;
    let source = path.display().to_string();
    let records = parse_rainfall(file, columns, &source)?;
    logging::info(
        Stage::Load,
        Some(&source),
        &format!("Loaded {} daily rainfall rows", records.len()),
    );
    Ok(records)
}

/// Parse rainfall records from any CSV reader.
///
/// Rows are returned in input order; sorting and de-duplication happen when
/// the series is built.
pub fn parse_rainfall<R: Read>(
    reader: R,
    columns: &RainfallColumns,
    source: &str,
) -> Result<Vec<RainfallRecord>, AnalysisError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let find_column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| AnalysisError::MalformedRow {
                source: source.to_string(),
                line: 1,
                reason: format!("missing column '{}'", name),
            })
    };
    let date_idx = find_column(&columns.date)?;
    let precip_idx = find_column(&columns.precipitation)?;

    let mut records = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let malformed = |reason: String| AnalysisError::MalformedRow {
            source: source.to_string(),
            line,
            reason,
        };

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| malformed(format!("unparseable date '{}'", raw_date)))?;

        let raw_precip = record.get(precip_idx).unwrap_or("");
        let tenths = parse_tenths(raw_precip).map_err(malformed)?;

        records.push(RainfallRecord {
            date,
            precipitation_mm: tenths.map(tenths_to_mm),
        });
    }

    if records.is_empty() {
        return Err(AnalysisError::EmptyInput(source.to_string()));
    }

    let unobserved = records.iter().filter(|r| r.precipitation_mm.is_none()).count();
    if unobserved > 0 {
        logging::warn(
            Stage::Load,
            Some(source),
            &format!("{} day(s) without a PRCP value; windows covering them are missing", unobserved),
        );
    }

    Ok(records)
}

/// Interpret a PRCP cell as an integer count of tenths of a millimetre.
///
/// Blank and sentinel cells are `None`. Some exports write integral values
/// with a trailing `.0`; those are accepted. Fractional, negative or
/// non-numeric values are rejected.
fn parse_tenths(raw: &str) -> Result<Option<i64>, String> {
    let raw = raw.trim();
    if is_missing_sentinel(raw) {
        return Ok(None);
    }
    let tenths = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let v: f64 = raw
                .parse()
                .map_err(|_| format!("non-numeric precipitation '{}'", raw))?;
            if !v.is_finite() || v.fract() != 0.0 {
                return Err(format!("precipitation '{}' is not a whole number of tenths", raw));
            }
            v as i64
        }
    };
    if tenths < 0 {
        return Err(format!("negative precipitation '{}'", raw));
    }
    Ok(Some(tenths))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const GHCN: &str = "\
\"STATION\",\"NAME\",\"DATE\",\"PRCP\",\"SNOW\",\"TMAX\"
\"USW00014742\",\"BURLINGTON INTL AIRPORT, VT US\",\"2019-04-01\",\"10\",\"0\",\"72\"
\"USW00014742\",\"BURLINGTON INTL AIRPORT, VT US\",\"2019-04-02\",\"0\",\"0\",\"80\"
\"USW00014742\",\"BURLINGTON INTL AIRPORT, VT US\",\"2019-04-03\",\"25.0\",\"\",\"91\"
";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 4, d).unwrap()
    }

    #[test]
    fn test_parse_rainfall_converts_tenths_to_mm() {
        let rows = parse_rainfall(GHCN.as_bytes(), &RainfallColumns::default(), "ghcn").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], RainfallRecord { date: day(1), precipitation_mm: Some(1.0) });
        assert_eq!(rows[1], RainfallRecord { date: day(2), precipitation_mm: Some(0.0) });
        assert_eq!(rows[2], RainfallRecord { date: day(3), precipitation_mm: Some(2.5) });
    }

    #[test]
    fn test_columns_are_found_by_name_case_insensitively() {
        let csv = "prcp,station,date\n5,X,20190401\n";
        let rows = parse_rainfall(csv.as_bytes(), &RainfallColumns::default(), "ghcn").unwrap();
        assert_eq!(rows, vec![RainfallRecord { date: day(1), precipitation_mm: Some(0.5) }]);
    }

    #[test]
    fn test_custom_column_names() {
        let csv = "obs_date,rain_tenths\n2019-04-02,30\n";
        let columns = RainfallColumns {
            date: "obs_date".to_string(),
            precipitation: "rain_tenths".to_string(),
        };
        let rows = parse_rainfall(csv.as_bytes(), &columns, "custom").unwrap();
        assert_eq!(rows[0].precipitation_mm, Some(3.0));
    }

    #[test]
    fn test_missing_precip_column_is_reported() {
        let csv = "DATE,SNOW\n2019-04-02,0\n";
        match parse_rainfall(csv.as_bytes(), &RainfallColumns::default(), "ghcn") {
            Err(AnalysisError::MalformedRow { reason, .. }) => assert!(reason.contains("PRCP")),
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_fractional_or_text_precip_fails() {
        for bad in ["-3", "2.5", "lots"] {
            let csv = format!("DATE,PRCP\n2019-04-02,{}\n", bad);
            assert!(
                matches!(
                    parse_rainfall(csv.as_bytes(), &RainfallColumns::default(), "ghcn"),
                    Err(AnalysisError::MalformedRow { .. })
                ),
                "PRCP '{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_blank_precip_is_kept_as_missing_day() {
        let csv = "DATE,PRCP\n2019-04-01,10\n2019-04-02,\n2019-04-03,5\n2019-04-04,NA\n";
        let rows = parse_rainfall(csv.as_bytes(), &RainfallColumns::default(), "ghcn").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].precipitation_mm, Some(1.0));
        assert_eq!(rows[1], RainfallRecord { date: day(2), precipitation_mm: None });
        assert_eq!(rows[2].precipitation_mm, Some(0.5));
        assert_eq!(rows[3].precipitation_mm, None);
    }

    #[test]
    fn test_parse_tenths_accepts_integral_decimal() {
        assert_eq!(parse_tenths("12"), Ok(Some(12)));
        assert_eq!(parse_tenths("12.0"), Ok(Some(12)));
        assert_eq!(parse_tenths(" 0 "), Ok(Some(0)));
        assert_eq!(parse_tenths(""), Ok(None));
    }
}
