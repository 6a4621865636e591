//! Reading point records from JSON files.
//!
//! Two layouts are accepted: a JSON array of objects, or one object per line
//! (`.ndjson` / `.jsonl`). Records are kept as raw objects and read through
//! [`FieldAccessor`], so field names are chosen on the command line.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use grid_aggregator::PointAccessor;
use grid_common::Position;
use serde_json::{Map, Value};

/// One input record.
pub type Record = Map<String, Value>;

/// Load all records of a file.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let line_delimited = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ndjson") | Some("jsonl")
    );
    if line_delimited {
        return parse_lines(&text).with_context(|| format!("Failed to parse {}", path.display()));
    }

    let value: Value = serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| into_record(item).with_context(|| format!("record {i} in {}", path.display())))
            .collect(),
        _ => bail!("{} must contain a JSON array of objects", path.display()),
    }
}

fn parse_lines(text: &str) -> Result<Vec<Record>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: Value = serde_json::from_str(line).with_context(|| format!("line {}", i + 1))?;
            into_record(value).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("expected an object, got {other}"),
    }
}

/// Reads positions and weights from named record fields.
///
/// A missing or non-numeric coordinate becomes NaN, so the record is
/// skipped by the hasher. A missing weight cannot be valued and fails the
/// aggregation for weight-based rules.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    pub lng_field: String,
    pub lat_field: String,
    /// Every record weighs 1 when `None`.
    pub weight_field: Option<String>,
}

impl FieldAccessor {
    fn number(record: &Record, field: &str) -> Option<f64> {
        record.get(field).and_then(Value::as_f64)
    }
}

impl Default for FieldAccessor {
    fn default() -> Self {
        Self {
            lng_field: "lng".to_string(),
            lat_field: "lat".to_string(),
            weight_field: None,
        }
    }
}

impl PointAccessor<Record> for FieldAccessor {
    fn position(&self, record: &Record) -> Position {
        Position::new(
            Self::number(record, &self.lng_field).unwrap_or(f64::NAN),
            Self::number(record, &self.lat_field).unwrap_or(f64::NAN),
        )
    }

    fn weight(&self, record: &Record) -> Option<f64> {
        match &self.weight_field {
            Some(field) => Self::number(record, field),
            None => Some(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "points.json",
            r#"[{"lng": 4.35, "lat": 50.85, "rain": 2.5}, {"lng": 4.36, "lat": 50.86}]"#,
        );

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);

        let accessor = FieldAccessor {
            weight_field: Some("rain".to_string()),
            ..FieldAccessor::default()
        };
        assert_eq!(accessor.position(&records[0]), Position::new(4.35, 50.85));
        assert_eq!(accessor.weight(&records[0]), Some(2.5));
        assert_eq!(accessor.weight(&records[1]), None);
        assert_eq!(FieldAccessor::default().weight(&records[1]), Some(1.0));
    }

    #[test]
    fn test_load_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "points.ndjson",
            "{\"x\": 1.0, \"y\": 2.0}\n\n{\"x\": \"n/a\", \"y\": 3.0}\n",
        );

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);

        let accessor = FieldAccessor {
            lng_field: "x".to_string(),
            lat_field: "y".to_string(),
            weight_field: None,
        };
        assert!(accessor.position(&records[0]).is_finite());
        assert!(!accessor.position(&records[1]).is_finite());
    }

    #[test]
    fn test_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "points.json", r#"{"lng": 1.0}"#);
        assert!(load_records(&path).is_err());

        let path = write_file(&dir, "numbers.json", "[1, 2, 3]");
        assert!(load_records(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_records(Path::new("/nonexistent/points.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
