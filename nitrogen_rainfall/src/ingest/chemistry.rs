/// Water-chemistry sheet loader
///
/// Reads the tributary nitrogen sheet, exported to CSV, into `Measurement`
/// rows. The layout is positional and fixed:
///
/// ```text
/// date, tributary, total_nitrogen, nitrate, ammonium, organic_nitrogen
/// ```
///
/// The header row is skipped without being checked, since the lab renames
/// columns between seasons but never reorders them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ingest::{is_missing_sentinel, parse_date};
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, Measurement};
use crate::tributaries::{all_codes, find_tributary};

/// Number of positional columns the sheet must carry.
pub const CHEMISTRY_COLUMNS: usize = 6;

/// Load measurements from a CSV file on disk.
pub fn load_measurements(path: &Path) -> Result<Vec<Measurement>, AnalysisError> {
    let file = File::open(path)?;
    let source = path.display().to_string();
    let measurements = parse_measurements(file, &source)?;
    logging::info(
        Stage::Load,
        Some(&source),
        &format!("Loaded {} chemistry samples", measurements.len()),
    );
    Ok(measurements)
}

/// Parse measurements from any CSV reader.
///
/// `source` names the input in error messages.
pub fn parse_measurements<R: Read>(reader: R, source: &str) -> Result<Vec<Measurement>, AnalysisError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut measurements = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Spreadsheet exports often end with rows of bare commas.
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let malformed = |reason: String| AnalysisError::MalformedRow {
            source: source.to_string(),
            line,
            reason,
        };

        if record.len() < CHEMISTRY_COLUMNS {
            return Err(malformed(format!(
                "expected {} columns, found {}",
                CHEMISTRY_COLUMNS,
                record.len()
            )));
        }

        let date = parse_date(&record[0])
            .ok_or_else(|| malformed(format!("unparseable date '{}'", &record[0])))?;

        let Some(tributary) = find_tributary(&record[1]) else {
            logging::error(
                Stage::Load,
                Some(source),
                &format!(
                    "Line {}: site '{}' is not one of {}",
                    line,
                    &record[1],
                    all_codes().join(", ")
                ),
            );
            return Err(AnalysisError::UnknownTributary(record[1].to_string()));
        };

        let mut concentrations = [None; 4];
        for (slot, raw) in concentrations.iter_mut().zip(record.iter().skip(2)) {
            *slot = parse_concentration(raw).map_err(malformed)?;
        }
        let [total_nitrogen, nitrate, ammonium, organic_nitrogen] = concentrations;

        measurements.push(Measurement {
            date,
            tributary,
            total_nitrogen,
            nitrate,
            ammonium,
            organic_nitrogen,
        });
    }

    if measurements.is_empty() {
        return Err(AnalysisError::EmptyInput(source.to_string()));
    }

    Ok(measurements)
}

/// Interpret one concentration cell.
///
/// Sentinel strings and negative numbers (the lab's -9999 convention) are
/// missing. Any other non-numeric text is an error.
fn parse_concentration(raw: &str) -> Result<Option<f64>, String> {
    if is_missing_sentinel(raw) {
        return Ok(None);
    }
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("non-numeric concentration '{}'", raw))?;
    if !value.is_finite() || value < 0.0 {
        return Ok(None);
    }
    Ok(Some(value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tributaries::Tributary;
    use chrono::NaiveDate;

    const SHEET: &str = "\
Date,Site,TN (mg/L),NO3-N (mg/L),NH4-N (mg/L),Org N (mg/L)
2019-04-02,Lewis Creek,1.10,0.62,0.05,0.43
04/03/2019,LaPlatte River,2.40,NA,0.12,
2019-04-03 00:00:00,Otter Creek,-9999,0.80,ND,0.30
,,,,,
";

    #[test]
    fn test_parse_measurements_reads_positional_columns() {
        let rows = parse_measurements(SHEET.as_bytes(), "sheet").unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2019, 4, 2).unwrap());
        assert_eq!(rows[0].tributary, Tributary::LewisCreek);
        assert_eq!(rows[0].total_nitrogen, Some(1.10));
        assert_eq!(rows[0].nitrate, Some(0.62));
        assert_eq!(rows[0].ammonium, Some(0.05));
        assert_eq!(rows[0].organic_nitrogen, Some(0.43));
    }

    #[test]
    fn test_sentinels_become_missing() {
        let rows = parse_measurements(SHEET.as_bytes(), "sheet").unwrap();

        assert_eq!(rows[1].tributary, Tributary::LaPlatteRiver);
        assert_eq!(rows[1].nitrate, None);
        assert_eq!(rows[1].organic_nitrogen, None);

        assert_eq!(rows[2].tributary, Tributary::OtterCreek);
        assert_eq!(rows[2].total_nitrogen, None, "negative sentinel should be missing");
        assert_eq!(rows[2].ammonium, None);
        assert_eq!(rows[2].nitrate, Some(0.80));
    }

    #[test]
    fn test_unknown_site_fails_the_load() {
        let sheet = "d,s,tn,no3,nh4,on\n2019-04-02,Winooski,1,1,1,1\n";
        match parse_measurements(sheet.as_bytes(), "sheet") {
            Err(AnalysisError::UnknownTributary(name)) => assert_eq!(name, "Winooski"),
            other => panic!("expected UnknownTributary, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_date_reports_line_number() {
        let sheet = "d,s,tn,no3,nh4,on\n2019-04-02,Lewis,1,1,1,1\nyesterday,Lewis,1,1,1,1\n";
        match parse_measurements(sheet.as_bytes(), "sheet") {
            Err(AnalysisError::MalformedRow { line, reason, .. }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("yesterday"));
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_short_row_is_malformed() {
        let sheet = "d,s,tn,no3,nh4,on\n2019-04-02,Lewis,1,1\n";
        assert!(matches!(
            parse_measurements(sheet.as_bytes(), "sheet"),
            Err(AnalysisError::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_text_in_numeric_column_is_malformed() {
        let sheet = "d,s,tn,no3,nh4,on\n2019-04-02,Lewis,high,1,1,1\n";
        assert!(matches!(
            parse_measurements(sheet.as_bytes(), "sheet"),
            Err(AnalysisError::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_header_only_sheet_is_empty_input() {
        let sheet = "d,s,tn,no3,nh4,on\n";
        assert!(matches!(
            parse_measurements(sheet.as_bytes(), "sheet"),
            Err(AnalysisError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_measurements(Path::new("/nonexistent/chemistry.csv"));
        assert!(matches!(result, Err(AnalysisError::Io(_))));
    }
}
