//! Per-paper calibration constants for flow-sorted sequencing assays.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::utils::IngestError;

/// Calibration of one fluorescence bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinCalibration {
    /// Fraction of the sorted population that fell into this bin
    pub cell_fraction: f64,
    /// Representative fluorescence of the bin
    pub fluo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEntry {
    pub id: String,
    #[serde(flatten)]
    pub calibration: BinCalibration,
}

/// Bin calibration table of one paper
///
/// Read totals are the sequencing depth of each replicate library; bins keep
/// the order in which they were declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    pub paper: String,
    pub total_rna_a: f64,
    pub total_rna_b: f64,
    pub total_dna_a: f64,
    pub total_dna_b: f64,
    pub bins: Vec<BinEntry>,
}

impl CalibrationTable {
    /// Parse and validate a calibration table from TOML
    pub fn from_toml_str(text: &str) -> Result<Self, IngestError> {
        let table: CalibrationTable = toml::from_str(text)
            .map_err(|e| IngestError::InvalidCalibration(format!("malformed calibration: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            IngestError::InvalidCalibration(msg) => {
                IngestError::InvalidCalibration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Reject empty bin lists and duplicate bin ids
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.bins.is_empty() {
            return Err(IngestError::InvalidCalibration(format!(
                "paper '{}' declares no bins",
                self.paper
            )));
        }
        let mut seen = HashSet::new();
        for entry in &self.bins {
            if !seen.insert(entry.id.as_str()) {
                return Err(IngestError::InvalidCalibration(format!(
                    "paper '{}' declares bin '{}' twice",
                    self.paper, entry.id
                )));
            }
        }
        Ok(())
    }

    /// Look up a bin; there is no fallback for unknown ids
    pub fn bin(&self, id: &str) -> Result<&BinCalibration, IngestError> {
        self.bins
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.calibration)
            .ok_or_else(|| IngestError::CalibrationKeyMissing {
                paper: self.paper.clone(),
                bin: id.to_string(),
            })
    }

    pub fn bin_ids(&self) -> impl Iterator<Item = &str> {
        self.bins.iter().map(|entry| entry.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
paper = "Kosuri_PNAS_2013"
total_rna_a = 1000.0
total_rna_b = 1200.0
total_dna_a = 500.0
total_dna_b = 600.0

[[bins]]
id = "BIN1"
cell_fraction = 0.4
fluo = 10.0

[[bins]]
id = "BIN2"
cell_fraction = 0.6
fluo = 1000.0
"#;

    #[test]
    fn test_parse_calibration() {
        let table = CalibrationTable::from_toml_str(SAMPLE).unwrap();
        assert_eq!(table.paper, "Kosuri_PNAS_2013");
        assert_eq!(table.total_rna_b, 1200.0);
        assert_eq!(table.bin_ids().collect::<Vec<_>>(), vec!["BIN1", "BIN2"]);

        let bin = table.bin("BIN2").unwrap();
        assert_eq!(bin.cell_fraction, 0.6);
        assert_eq!(bin.fluo, 1000.0);
    }

    #[test]
    fn test_unknown_bin() {
        let table = CalibrationTable::from_toml_str(SAMPLE).unwrap();
        let err = table.bin("bin1").unwrap_err();
        assert_eq!(
            err,
            IngestError::CalibrationKeyMissing {
                paper: "Kosuri_PNAS_2013".to_string(),
                bin: "bin1".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_bins_rejected() {
        let text = format!("{}\n[[bins]]\nid = \"BIN1\"\ncell_fraction = 0.1\nfluo = 5.0\n", SAMPLE);
        let err = CalibrationTable::from_toml_str(&text).unwrap_err();
        assert!(err.to_string().contains("declares bin 'BIN1' twice"));
    }

    #[test]
    fn test_missing_total_rejected() {
        let text = SAMPLE.replace("total_dna_b = 600.0", "");
        assert!(matches!(
            CalibrationTable::from_toml_str(&text),
            Err(IngestError::InvalidCalibration(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kosuri.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let table = CalibrationTable::load(&path).unwrap();
        assert_eq!(table.bins.len(), 2);
    }
}
