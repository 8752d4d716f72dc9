use crate::error::{Error, Result};
use crate::types::{Row, Value};
use csv::ReaderBuilder;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
}

/// Load rows from a `.json` or `.csv` file, chosen by extension.
pub fn load_rows(path: impl AsRef<Path>) -> Result<(Vec<Row>, LoadReport)> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let text = std::fs::read_to_string(path)?;
        rows_from_json(&text)
    } else {
        load_csv(path)
    }
}

/// Every CSV record becomes a row keyed by header. Empty cells are null;
/// short records simply lack the trailing columns.
pub fn load_csv(path: impl AsRef<Path>) -> Result<(Vec<Row>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for result in rdr.records() {
        report.total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::debug!("skipping unreadable CSV record: {e}");
                report.skipped_rows += 1;
                continue;
            }
        };
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| {
                let value = if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::from(cell)
                };
                (h.clone(), value)
            })
            .collect();
        rows.push(row);
    }
    report.loaded_rows = rows.len();
    Ok((rows, report))
}

/// Parse a JSON payload into rows.
///
/// Accepted shapes: an array of objects, `null` (no rows), or an object
/// wrapping the array under `rows` or `cleanedRows`. Array elements that
/// are not objects are skipped. Anything else is rejected.
pub fn rows_from_json(text: &str) -> Result<(Vec<Row>, LoadReport)> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let items = match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => {
            match map.remove("rows").or_else(|| map.remove("cleanedRows")) {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(Error::InvalidInput(
                        "expected an array of rows or an object with a `rows` array".into(),
                    ))
                }
            }
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "expected an array of rows, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut report = LoadReport {
        total_rows: items.len(),
        ..LoadReport::default()
    };
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            report.skipped_rows += 1;
            continue;
        }
        match serde_json::from_value::<Row>(item) {
            Ok(row) => rows.push(row),
            Err(e) => {
                log::debug!("skipping row with unsupported values: {e}");
                report.skipped_rows += 1;
            }
        }
    }
    report.loaded_rows = rows.len();
    Ok((rows, report))
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_array_of_objects() {
        let (rows, report) = rows_from_json(
            r#"[{"AgentName": "Mei", "CSAT": 91, "WithinSLA": true, "Notes": null}, 42]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(rows[0].get("CSAT"), Some(&Value::Number(91.0)));
        assert_eq!(rows[0].get("WithinSLA"), Some(&Value::Bool(true)));
        assert_eq!(rows[0].get("Notes"), Some(&Value::Null));
    }

    #[test]
    fn test_json_null_and_wrapped_shapes() {
        let (rows, _) = rows_from_json("null").unwrap();
        assert!(rows.is_empty());
        let (rows, _) = rows_from_json(r#"{"cleanedRows": [{"CSAT": "80"}]}"#).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_json_non_array_is_rejected() {
        assert!(matches!(rows_from_json("17"), Err(Error::InvalidInput(_))));
        assert!(matches!(rows_from_json(r#"{"a": 1}"#), Err(Error::InvalidInput(_))));
        assert!(matches!(rows_from_json("[1,"), Err(Error::Json(_))));
    }

    #[test]
    fn test_nested_values_are_skipped() {
        let (rows, report) = rows_from_json(r#"[{"CSAT": [1, 2]}, {"CSAT": 1}]"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn test_load_csv_with_empty_cells() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Date,AgentName,CSAT,AHT,Resolution_Status").unwrap();
        writeln!(file, "2024-05-01,Akari,90,04:00,Resolved").unwrap();
        writeln!(file, "2024-05-01,Kenji,,300,").unwrap();
        writeln!(file, "2024-05-02,Mei").unwrap();

        let (rows, report) = load_rows(file.path()).unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.loaded_rows, 3);
        assert_eq!(rows[0].get("AHT"), Some(&Value::from("04:00")));
        assert_eq!(rows[1].get("CSAT"), Some(&Value::Null));
        assert!(!rows[2].contains_key("CSAT"));
    }

    #[test]
    fn test_load_rows_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"CSAT": 88}}]"#).unwrap();
        let (rows, _) = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
