use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use crate::utils::IngestError;

/// One raw column handed over by the extraction layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(values) => Some(values),
            Column::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Column::Text(values) => Some(values),
            Column::Numeric(_) => None,
        }
    }
}

/// The raw column arrays of one experiment, keyed by field name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawColumns {
    pub name: String,
    columns: BTreeMap<String, Column>,
}

impl RawColumns {
    /// Create an empty column set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Add or replace a column
    pub fn insert(&mut self, key: impl Into<String>, column: Column) {
        self.columns.insert(key.into(), column);
    }

    pub fn with_numeric(mut self, key: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(key, Column::Numeric(values));
        self
    }

    pub fn with_text<S: Into<String>>(mut self, key: impl Into<String>, values: Vec<S>) -> Self {
        self.insert(key, Column::Text(values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.columns.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Column)> {
        self.columns.iter()
    }

    /// All field names, sorted
    pub fn field_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Number of rows shared by every column
    ///
    /// # Returns
    /// * `Ok(rows)` - Common length (0 for an empty column set)
    /// * `Err(IngestError::SchemaMismatch)` - If two columns differ in length
    pub fn row_count(&self) -> Result<usize, IngestError> {
        let mut lengths = self.columns.iter().map(|(k, c)| (k, c.len()));
        let Some((first_key, rows)) = lengths.next() else {
            return Ok(0);
        };
        for (key, len) in lengths {
            if len != rows {
                return Err(IngestError::SchemaMismatch(format!(
                    "experiment '{}': column '{}' has {} rows but '{}' has {}",
                    self.name, key, len, first_key, rows
                )));
            }
        }
        Ok(rows)
    }

    /// Text column by name
    ///
    /// A zero-length numeric column reads as an empty text column.
    pub fn text(&self, key: &str) -> Result<&[String], IngestError> {
        let column = self
            .get(key)
            .ok_or_else(|| IngestError::missing_column(&self.name, key))?;
        match column {
            Column::Text(values) => Ok(values.as_slice()),
            Column::Numeric(values) if values.is_empty() => Ok(&[][..]),
            Column::Numeric(_) => Err(IngestError::SchemaMismatch(format!(
                "experiment '{}': column '{}' is numeric, expected text",
                self.name, key
            ))),
        }
    }

    /// Numeric column by name
    ///
    /// A text column with no non-blank cell reads as all NaN, so blank or
    /// zero-row measurement columns stay usable.
    pub fn numeric(&self, key: &str) -> Result<Cow<'_, [f64]>, IngestError> {
        let column = self
            .get(key)
            .ok_or_else(|| IngestError::missing_column(&self.name, key))?;
        match column {
            Column::Numeric(values) => Ok(Cow::Borrowed(values.as_slice())),
            Column::Text(values) if values.iter().all(|v| v.trim().is_empty()) => {
                Ok(Cow::Owned(vec![f64::NAN; values.len()]))
            }
            Column::Text(_) => Err(IngestError::SchemaMismatch(format!(
                "experiment '{}': column '{}' is text, expected numeric",
                self.name, key
            ))),
        }
    }

    /// Load columns from CSV with a header row
    ///
    /// A column is numeric when every non-empty cell parses as a number and
    /// at least one cell is non-empty; empty cells of numeric columns become NaN.
    pub fn from_csv(name: impl Into<String>, csv_data: &str) -> Result<Self, IngestError> {
        let mut raw = RawColumns::new(name);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| IngestError::SchemaMismatch(format!("unreadable CSV header: {}", e)))?
            .clone();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

        for result in reader.records() {
            let record = result
                .map_err(|e| IngestError::SchemaMismatch(format!("malformed CSV row: {}", e)))?;
            for (i, field) in record.iter().enumerate() {
                if let Some(column) = cells.get_mut(i) {
                    column.push(field.to_string());
                }
            }
        }

        for (header, values) in headers.iter().zip(cells) {
            raw.insert(header, infer_column(values));
        }
        Ok(raw)
    }

    /// Load columns from a JSON object of arrays
    pub fn from_json(name: impl Into<String>, json_data: &str) -> Result<Self, IngestError> {
        let mut raw = RawColumns::new(name);
        let data: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_str(json_data)
            .map_err(|e| IngestError::SchemaMismatch(format!("malformed JSON columns: {}", e)))?;

        for (key, values) in data {
            let column = if values.iter().all(|v| v.is_number() || v.is_null()) {
                Column::Numeric(values.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
            } else if values.iter().all(|v| v.is_string()) {
                Column::Text(
                    values
                        .into_iter()
                        .map(|v| match v {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                )
            } else {
                return Err(IngestError::SchemaMismatch(format!(
                    "experiment '{}': JSON column '{}' mixes value types",
                    raw.name, key
                )));
            };
            raw.insert(key, column);
        }
        Ok(raw)
    }

    /// Load columns from a file, picking the format from its extension
    /// (`csv`, `json`, `arrow`/`ipc`)
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, IngestError> {
        let name = name.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::from_csv(name, &std::fs::read_to_string(path)?),
            "json" => Self::from_json(name, &std::fs::read_to_string(path)?),
            "arrow" | "ipc" => crate::arrow_handler::parse_raw_columns(name, &std::fs::read(path)?),
            other => Err(IngestError::IoError(format!(
                "unsupported column file extension '{}' for {}",
                other,
                path.display()
            ))),
        }
    }
}

fn infer_column(values: Vec<String>) -> Column {
    let mut any_value = false;
    let mut parsed = Vec::with_capacity(values.len());
    for value in &values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            parsed.push(f64::NAN);
            continue;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => {
                any_value = true;
                parsed.push(v);
            }
            Err(_) => return Column::Text(values),
        }
    }
    if any_value {
        Column::Numeric(parsed)
    } else {
        Column::Text(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_consistent() {
        let raw = RawColumns::new("exp")
            .with_text("5'UTR", vec!["AAG", "GGA"])
            .with_numeric("PROT.MEAN", vec![1.0, 2.0]);
        assert_eq!(raw.row_count().unwrap(), 2);
    }

    #[test]
    fn test_row_count_empty() {
        assert_eq!(RawColumns::new("empty").row_count().unwrap(), 0);
    }

    #[test]
    fn test_row_count_mismatch() {
        let raw = RawColumns::new("exp")
            .with_text("CDS", vec!["ATG"])
            .with_numeric("PROT.MEAN", vec![1.0, 2.0]);
        let err = raw.row_count().unwrap_err();
        assert!(matches!(err, IngestError::SchemaMismatch(_)));
    }

    #[test]
    fn test_typed_access_errors() {
        let raw = RawColumns::new("exp").with_numeric("TSS", vec![3.0]);
        assert!(raw.numeric("TSS").is_ok());
        assert!(raw.text("TSS").unwrap_err().to_string().contains("expected text"));
        assert!(raw.numeric("RBS").unwrap_err().to_string().contains("no raw column 'RBS'"));
    }

    #[test]
    fn test_csv_loading() {
        let csv_data = "5'UTR,CDS,PROT.MEAN,PROT.STD\nAAGGAG,ATGCGT,120.5,\nTTAGGA,ATGAAA,98,4.5";
        let raw = RawColumns::from_csv("csv_exp", csv_data).unwrap();

        assert_eq!(raw.row_count().unwrap(), 2);
        assert_eq!(raw.text("5'UTR").unwrap()[1], "TTAGGA");
        assert_eq!(&*raw.numeric("PROT.MEAN").unwrap(), &[120.5, 98.0]);

        let std = raw.numeric("PROT.STD").unwrap();
        assert!(std[0].is_nan());
        assert_eq!(std[1], 4.5);
    }

    #[test]
    fn test_csv_all_empty_column_is_text() {
        let csv_data = "5'UTR,CDS\n,ATG\n,ATG";
        let raw = RawColumns::from_csv("csv_exp", csv_data).unwrap();
        assert_eq!(raw.text("5'UTR").unwrap(), &["".to_string(), "".to_string()]);
    }

    #[test]
    fn test_blank_column_reads_as_nan() {
        let csv_data = "CDS,PROT.STD\nATG,\nATG, ";
        let raw = RawColumns::from_csv("csv_exp", csv_data).unwrap();
        let std = raw.numeric("PROT.STD").unwrap();
        assert_eq!(std.len(), 2);
        assert!(std.iter().all(|v| v.is_nan()));
        assert!(raw.numeric("CDS").unwrap_err().to_string().contains("expected numeric"));
    }

    #[test]
    fn test_header_only_csv() {
        let raw = RawColumns::from_csv("csv_exp", "5'UTR,CDS,PROT.MEAN\n").unwrap();
        assert_eq!(raw.row_count().unwrap(), 0);
        assert!(raw.numeric("PROT.MEAN").unwrap().is_empty());
        assert!(raw.text("CDS").unwrap().is_empty());
    }

    #[test]
    fn test_empty_json_arrays_read_as_either_type() {
        let raw = RawColumns::from_json("json_exp", r#"{"CDS": [], "PROT.MEAN": []}"#).unwrap();
        assert!(raw.text("CDS").unwrap().is_empty());
        assert!(raw.numeric("PROT.MEAN").unwrap().is_empty());
    }

    #[test]
    fn test_json_loading() {
        let json_data = r#"{
            "5'UTR": ["AAGGAG", "TTAGGA"],
            "PROT.MEAN": [12.5, null]
        }"#;
        let raw = RawColumns::from_json("json_exp", json_data).unwrap();

        assert_eq!(raw.field_names(), vec!["5'UTR", "PROT.MEAN"]);
        let prot = raw.numeric("PROT.MEAN").unwrap();
        assert_eq!(prot[0], 12.5);
        assert!(prot[1].is_nan());
    }

    #[test]
    fn test_json_mixed_column_rejected() {
        let json_data = r#"{"CDS": ["ATG", 3]}"#;
        let err = RawColumns::from_json("json_exp", json_data).unwrap_err();
        assert!(err.to_string().contains("mixes value types"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.csv");
        std::fs::write(&path, "CDS,PROT.MEAN\nATG,1\n").unwrap();

        let raw = RawColumns::load("file_exp", &path).unwrap();
        assert_eq!(raw.name, "file_exp");
        assert_eq!(raw.row_count().unwrap(), 1);

        let bad = dir.path().join("columns.xls");
        std::fs::write(&bad, "").unwrap();
        assert!(matches!(
            RawColumns::load("file_exp", &bad),
            Err(IngestError::IoError(_))
        ));
    }
}
