use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical field names of the unified table
pub mod fields {
    pub const UTR: &str = "5'UTR";
    pub const CDS: &str = "CDS";
    pub const MRNA: &str = "mRNA";
    pub const START_POS: &str = "START.POS";
    pub const PROTEIN: &str = "PROTEIN";
    pub const ORGANISM: &str = "ORGANISM";
    pub const METHOD: &str = "METHOD";
    pub const TEMP: &str = "TEMP";
    pub const PAPER: &str = "PAPER";
    pub const PROT_MEAN: &str = "PROT.MEAN";
    pub const PROT_STD: &str = "PROT.STD";
    pub const PROT_VAR: &str = "PROT.VAR";
    pub const RNA_A: &str = "RNA.A";
    pub const RNA_B: &str = "RNA.B";
    pub const RNA: &str = "RNA";
    pub const RNA_VAR: &str = "RNA.VAR";
    pub const RNA_STD: &str = "RNA.STD";
    pub const TRANSL_RATE: &str = "TRANSL.RATE";
    pub const TRANSL_RATE_VAR: &str = "TRANSL.RATE.VAR";
    pub const TRANSL_RATE_STD: &str = "TRANSL.RATE.STD";
    pub const SUBGROUP: &str = "subgroup";

    /// Fields interned into closed value sets once the table is complete
    pub const CATEGORICAL: [&str; 4] = [PROTEIN, ORGANISM, METHOD, PAPER];

    /// Every field a record or the finished table produces; raw columns
    /// with these names are never carried through as extras
    pub const CANONICAL: [&str; 21] = [
        UTR,
        CDS,
        MRNA,
        START_POS,
        PROTEIN,
        ORGANISM,
        METHOD,
        TEMP,
        PAPER,
        PROT_MEAN,
        PROT_STD,
        PROT_VAR,
        RNA_A,
        RNA_B,
        RNA,
        RNA_VAR,
        RNA_STD,
        TRANSL_RATE,
        TRANSL_RATE_VAR,
        TRANSL_RATE_STD,
        SUBGROUP,
    ];
}

/// How the expression level of a sequence was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "Individually Characterized")]
    IndividuallyCharacterized,
    #[serde(rename = "Flow-seq")]
    FlowSeq,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::IndividuallyCharacterized => "Individually Characterized",
            Method::FlowSeq => "Flow-seq",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell of the unified table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Integer(i64),
    /// Field not produced by this record's experiment
    Absent,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Text(_) | CellValue::Absent => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(v) => write!(f, "{}", v),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Absent => Ok(()),
        }
    }
}

/// RNA, protein and translation-rate estimates reconstructed from
/// flow-sorted sequencing counts. NaN marks an undefined estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSeqEstimate {
    pub rna_a: f64,
    pub rna_b: f64,
    pub rna: f64,
    pub rna_var: f64,
    pub prot_var: f64,
    pub transl_rate: f64,
    pub transl_rate_var: f64,
}

impl FlowSeqEstimate {
    pub fn rna_std(&self) -> f64 {
        self.rna_var.sqrt()
    }

    pub fn prot_std(&self) -> f64 {
        self.prot_var.sqrt()
    }

    pub fn transl_rate_std(&self) -> f64 {
        self.transl_rate_var.sqrt()
    }

    /// True when any reconstructed quantity is undefined
    pub fn is_undefined(&self) -> bool {
        [
            self.rna,
            self.rna_var,
            self.prot_var,
            self.transl_rate,
            self.transl_rate_var,
        ]
        .iter()
        .any(|v| v.is_nan())
    }
}

/// One row of the unified table
///
/// `mRNA` and `START.POS` are derived from the 5'UTR and CDS on every
/// sequence change, so the sequence fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    utr: String,
    cds: String,
    mrna: String,
    start_pos: usize,
    pub protein: String,
    pub organism: String,
    pub method: Method,
    pub temp: f64,
    pub paper: String,
    pub prot_mean: Option<f64>,
    pub prot_std: Option<f64>,
    pub flow_seq: Option<FlowSeqEstimate>,
    /// Raw experiment fields carried into the table unchanged
    pub extra: BTreeMap<String, CellValue>,
}

impl SequenceRecord {
    pub fn new(
        utr: impl Into<String>,
        cds: impl Into<String>,
        protein: impl Into<String>,
        organism: impl Into<String>,
        method: Method,
        temp: f64,
        paper: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            utr: String::new(),
            cds: String::new(),
            mrna: String::new(),
            start_pos: 0,
            protein: protein.into(),
            organism: organism.into(),
            method,
            temp,
            paper: paper.into(),
            prot_mean: None,
            prot_std: None,
            flow_seq: None,
            extra: BTreeMap::new(),
        };
        record.set_sequences(utr, cds);
        record
    }

    /// Replace both sequences and rederive mRNA and START.POS
    pub fn set_sequences(&mut self, utr: impl Into<String>, cds: impl Into<String>) {
        self.utr = utr.into();
        self.cds = cds.into();
        self.mrna = format!("{}{}", self.utr, self.cds);
        self.start_pos = self.utr.chars().count();
    }

    pub fn set_utr(&mut self, utr: impl Into<String>) {
        let cds = std::mem::take(&mut self.cds);
        self.set_sequences(utr, cds);
    }

    pub fn set_cds(&mut self, cds: impl Into<String>) {
        let utr = std::mem::take(&mut self.utr);
        self.set_sequences(utr, cds);
    }

    pub fn utr(&self) -> &str {
        &self.utr
    }

    pub fn cds(&self) -> &str {
        &self.cds
    }

    pub fn mrna(&self) -> &str {
        &self.mrna
    }

    pub fn start_pos(&self) -> usize {
        self.start_pos
    }

    /// Flatten into (field, value) pairs in table column order. Fields this
    /// record cannot produce are left out; the aggregator marks them absent.
    pub fn to_row(&self) -> Vec<(String, CellValue)> {
        let mut row = vec![
            (fields::UTR.to_string(), CellValue::Text(self.utr.clone())),
            (fields::CDS.to_string(), CellValue::Text(self.cds.clone())),
            (fields::MRNA.to_string(), CellValue::Text(self.mrna.clone())),
            (
                fields::START_POS.to_string(),
                CellValue::Integer(self.start_pos as i64),
            ),
            (fields::PROTEIN.to_string(), CellValue::Text(self.protein.clone())),
            (fields::ORGANISM.to_string(), CellValue::Text(self.organism.clone())),
            (
                fields::METHOD.to_string(),
                CellValue::Text(self.method.as_str().to_string()),
            ),
            (fields::TEMP.to_string(), CellValue::Number(self.temp)),
            (fields::PAPER.to_string(), CellValue::Text(self.paper.clone())),
        ];
        if let Some(mean) = self.prot_mean {
            row.push((fields::PROT_MEAN.to_string(), CellValue::Number(mean)));
        }
        if let Some(std) = self.prot_std {
            row.push((fields::PROT_STD.to_string(), CellValue::Number(std)));
        }
        if let Some(est) = &self.flow_seq {
            let numbers = [
                (fields::PROT_VAR, est.prot_var),
                (fields::RNA_A, est.rna_a),
                (fields::RNA_B, est.rna_b),
                (fields::RNA, est.rna),
                (fields::RNA_VAR, est.rna_var),
                (fields::RNA_STD, est.rna_std()),
                (fields::TRANSL_RATE, est.transl_rate),
                (fields::TRANSL_RATE_VAR, est.transl_rate_var),
                (fields::TRANSL_RATE_STD, est.transl_rate_std()),
            ];
            row.extend(
                numbers
                    .into_iter()
                    .map(|(name, v)| (name.to_string(), CellValue::Number(v))),
            );
        }
        row.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> SequenceRecord {
        SequenceRecord::new(
            "AAGGAG",
            "ATGCGT",
            "RFP",
            "Escherichia coli",
            Method::IndividuallyCharacterized,
            37.0,
            "Tian_NAR_2015",
        )
    }

    #[test]
    fn test_derived_sequence_fields() {
        let record = sample();
        assert_eq!(record.mrna(), "AAGGAGATGCGT");
        assert_eq!(record.start_pos(), 6);
    }

    #[test]
    fn test_derived_fields_follow_changes() {
        let mut record = sample();
        record.set_utr("GG");
        assert_eq!(record.mrna(), "GGATGCGT");
        assert_eq!(record.start_pos(), 2);

        record.set_cds("ATGTAA");
        assert_eq!(record.utr(), "GG");
        assert_eq!(record.mrna(), "GGATGTAA");
        assert_eq!(record.start_pos(), 2);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::FlowSeq.to_string(), "Flow-seq");
        assert_eq!(
            Method::IndividuallyCharacterized.as_str(),
            "Individually Characterized"
        );
    }

    #[test]
    fn test_row_omits_missing_measurements() {
        let mut record = sample();
        record.prot_mean = Some(120.0);
        let row = record.to_row();
        let names: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();

        assert!(names.contains(&fields::PROT_MEAN));
        assert!(!names.contains(&fields::PROT_STD));
        assert!(!names.contains(&fields::RNA));
        assert_eq!(row[3].1, CellValue::Integer(6));
    }

    #[test]
    fn test_row_includes_flow_seq_and_extras() {
        let mut record = sample();
        record.flow_seq = Some(FlowSeqEstimate {
            rna_a: 1.0,
            rna_b: 3.0,
            rna: 2.0,
            rna_var: 4.0,
            prot_var: 9.0,
            transl_rate: 5.0,
            transl_rate_var: 16.0,
        });
        record
            .extra
            .insert("PROMOTER.ID".to_string(), CellValue::Text("pLac".to_string()));

        let row = record.to_row();
        let lookup = |name: &str| row.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
        assert_eq!(lookup(fields::RNA_STD), Some(CellValue::Number(2.0)));
        assert_eq!(lookup(fields::TRANSL_RATE_STD), Some(CellValue::Number(4.0)));
        assert_eq!(lookup("PROMOTER.ID"), Some(CellValue::Text("pLac".to_string())));
    }

    #[test]
    fn test_estimate_undefined() {
        let est = FlowSeqEstimate {
            rna_a: f64::NAN,
            rna_b: 1.0,
            rna: f64::NAN,
            rna_var: f64::NAN,
            prot_var: 1.0,
            transl_rate: f64::NAN,
            transl_rate_var: f64::NAN,
        };
        assert!(est.is_undefined());
    }

    proptest! {
        #[test]
        fn mrna_is_concatenation(utr in "[ACGT]{0,40}", cds in "[ACGT]{0,60}") {
            let mut record = sample();
            record.set_sequences(utr.clone(), cds.clone());
            prop_assert_eq!(record.mrna(), format!("{}{}", utr, cds));
            prop_assert_eq!(record.start_pos(), utr.len());
        }
    }
}
