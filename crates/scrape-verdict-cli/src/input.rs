//! Reading response and record documents from disk.

use std::path::Path;

use serde_json::Value;

use scrape_verdict::{RawResponse, ScrapedRecord};

/// Errors while loading command-line input documents.
#[derive(thiserror::Error, Debug)]
pub enum InputError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response document {0} must be a JSON object")]
    ResponseNotObject(String),

    #[error("Records document {0} must be a JSON array")]
    RecordsNotArray(String),

    #[error("Record {index} in {path} is not a JSON object")]
    RecordNotObject { path: String, index: usize },

    #[error("Invalid CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

fn read_json(path: &Path) -> Result<Value, InputError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| InputError::Json {
        path: display,
        source,
    })
}

/// Load a response document (`status_code`, `headers`, `content`, `url`,
/// `elapsed`; every key optional).
pub fn load_response(path: &Path) -> Result<RawResponse, InputError> {
    let value = read_json(path)?;
    parse_response(&value, &path.display().to_string())
}

pub fn parse_response(value: &Value, source: &str) -> Result<RawResponse, InputError> {
    if !value.is_object() {
        return Err(InputError::ResponseNotObject(source.to_string()));
    }
    Ok(RawResponse::from_json(value))
}

/// How a records file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsFormat {
    /// A JSON array of objects.
    Json,
    /// A header row, then one record per row; every cell is a string.
    Csv,
}

impl RecordsFormat {
    /// `.csv` files are CSV, anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Load a records file, picking the format from its extension.
pub fn load_records(path: &Path) -> Result<Vec<ScrapedRecord>, InputError> {
    let source = path.display().to_string();
    let records = match RecordsFormat::from_path(path) {
        RecordsFormat::Json => parse_records(read_json(path)?, &source)?,
        RecordsFormat::Csv => {
            let file = std::fs::File::open(path).map_err(|e| InputError::Io {
                path: source.clone(),
                source: e,
            })?;
            parse_csv_records(file, &source)?
        }
    };
    tracing::debug!("Loaded {} records from {source}", records.len());
    Ok(records)
}

/// Read CSV rows as records keyed by the header row. Short rows leave the
/// missing columns absent.
pub fn parse_csv_records<R: std::io::Read>(
    reader: R,
    source: &str,
) -> Result<Vec<ScrapedRecord>, InputError> {
    let csv_error = |e: csv::Error| InputError::Csv {
        path: source.to_string(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers().map_err(csv_error)?.clone();

    reader
        .records()
        .map(|row| {
            let row = row.map_err(csv_error)?;
            Ok(headers
                .iter()
                .zip(row.iter())
                .map(|(field, value)| (field.trim().to_string(), value.to_string()))
                .collect::<ScrapedRecord>())
        })
        .collect()
}

pub fn parse_records(value: Value, source: &str) -> Result<Vec<ScrapedRecord>, InputError> {
    let Value::Array(items) = value else {
        return Err(InputError::RecordsNotArray(source.to_string()));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(ScrapedRecord::from(map)),
            _ => Err(InputError::RecordNotObject {
                path: source.to_string(),
                index,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_records() {
        let records = parse_records(json!([{"title": "A"}, {"title": "B", "price": 2}]), "r.json").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("price"), Some(&json!(2)));
    }

    #[test]
    fn test_parse_records_rejects_non_objects() {
        let err = parse_records(json!([{"title": "A"}, 5]), "r.json").unwrap_err();
        assert!(matches!(err, InputError::RecordNotObject { index: 1, .. }));
        assert_eq!(err.to_string(), "Record 1 in r.json is not a JSON object");

        let err = parse_records(json!({"title": "A"}), "r.json").unwrap_err();
        assert!(matches!(err, InputError::RecordsNotArray(_)));
    }

    #[test]
    fn test_parse_response() {
        let raw = parse_response(&json!({"status_code": 403}), "resp.json").unwrap();
        assert_eq!(raw.status_code, Some(403));
        assert!(matches!(
            parse_response(&json!([1, 2]), "resp.json"),
            Err(InputError::ResponseNotObject(_))
        ));
    }

    #[test]
    fn test_parse_csv_records() {
        let csv = "title,price,sku\nWidget A,$9.99,W-1\nWidget B,,W-2\nShort\n";
        let records = parse_csv_records(csv.as_bytes(), "data.csv").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("price"), Some(&json!("$9.99")));
        assert_eq!(records[1].get("price"), Some(&json!("")));
        assert_eq!(records[2].get("title"), Some(&json!("Short")));
        assert_eq!(records[2].get("sku"), None);
    }

    #[test]
    fn test_records_format_from_extension() {
        assert_eq!(RecordsFormat::from_path(Path::new("out/scraped_data.CSV")), RecordsFormat::Csv);
        assert_eq!(RecordsFormat::from_path(Path::new("records.json")), RecordsFormat::Json);
        assert_eq!(RecordsFormat::from_path(Path::new("records")), RecordsFormat::Json);
    }

    #[test]
    fn test_missing_file() {
        let err = load_records(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
