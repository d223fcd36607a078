//! Maps an experiment's raw columns onto canonical sequence records.

use crate::columns::{Column, RawColumns};
use crate::record::{fields, CellValue, Method, SequenceRecord};
use crate::utils::{round_offset, IngestError};

/// A metadata field that is either fixed for the experiment or read per row
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    Constant(String),
    Column(String),
}

impl FieldSource {
    pub fn constant(value: impl Into<String>) -> Self {
        FieldSource::Constant(value.into())
    }

    pub fn column(name: impl Into<String>) -> Self {
        FieldSource::Column(name.into())
    }

    fn column_name(&self) -> Option<&str> {
        match self {
            FieldSource::Column(name) => Some(name),
            FieldSource::Constant(_) => None,
        }
    }
}

/// How the 5'UTR of each row is put together
#[derive(Debug, Clone, PartialEq)]
pub enum UtrAssembly {
    /// Read from the `5'UTR` column as is
    Direct,
    /// Concatenation of the listed columns, in order
    Concat(Vec<String>),
    /// Transcribed part of the promoter (from the transcription start site
    /// onward), followed by the tail columns and a fixed suffix
    TranscribedLeader {
        promoter: String,
        tss: String,
        tail: Vec<String>,
        suffix: String,
    },
}

impl UtrAssembly {
    fn source_columns(&self) -> Vec<&str> {
        match self {
            UtrAssembly::Direct => vec![fields::UTR],
            UtrAssembly::Concat(parts) => parts.iter().map(String::as_str).collect(),
            UtrAssembly::TranscribedLeader {
                promoter,
                tss,
                tail,
                ..
            } => {
                let mut cols = vec![promoter.as_str(), tss.as_str()];
                cols.extend(tail.iter().map(String::as_str));
                cols
            }
        }
    }
}

/// Bin layout of a flow-sorted sequencing experiment
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSeqLayout {
    /// Bin ids, each naming a raw count column
    pub bins: Vec<String>,
}

/// Everything the normalizer needs to know about one experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentProfile {
    pub paper: String,
    pub protein: FieldSource,
    pub organism: FieldSource,
    pub temp: f64,
    pub utr: UtrAssembly,
    pub cds: String,
    pub prot_mean: Option<String>,
    pub prot_std: Option<String>,
    pub flow_seq: Option<FlowSeqLayout>,
}

impl ExperimentProfile {
    pub fn method(&self) -> Method {
        if self.flow_seq.is_some() {
            Method::FlowSeq
        } else {
            Method::IndividuallyCharacterized
        }
    }

    /// Raw columns the profile reads; all must be present
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = self.utr.source_columns();
        cols.push(self.cds.as_str());
        cols.extend(self.protein.column_name());
        cols.extend(self.organism.column_name());
        cols.extend(self.prot_mean.as_deref());
        cols.extend(self.prot_std.as_deref());
        if let Some(layout) = &self.flow_seq {
            cols.extend(crate::flowseq::COUNT_COLUMNS);
            cols.extend(layout.bins.iter().map(String::as_str));
        }
        cols
    }
}

/// Build one canonical record per row of `raw`
///
/// # Returns
/// * `Ok(records)` - In row order; flow-seq estimates are not filled in yet
/// * `Err(IngestError::SchemaMismatch)` - Unequal column lengths, a missing
///   or mistyped declared column, or an invalid TSS offset
pub fn normalize(
    profile: &ExperimentProfile,
    raw: &RawColumns,
) -> Result<Vec<SequenceRecord>, IngestError> {
    let rows = raw.row_count()?;
    for col in profile.required_columns() {
        if !raw.contains(col) {
            return Err(IngestError::missing_column(&profile.paper, col));
        }
    }

    let utrs = assemble_utrs(&profile.utr, raw, rows)?;
    let cds = raw.text(&profile.cds)?;
    let proteins = resolve_field(&profile.protein, raw)?;
    let organisms = resolve_field(&profile.organism, raw)?;
    let prot_mean = profile.prot_mean.as_deref().map(|c| raw.numeric(c)).transpose()?;
    let prot_std = profile.prot_std.as_deref().map(|c| raw.numeric(c)).transpose()?;

    // Measurement columns become canonical fields; every other raw column
    // that is not itself canonical rides along unchanged.
    let extras: Vec<(&String, &Column)> = raw
        .iter()
        .filter(|(name, _)| {
            !fields::CANONICAL.contains(&name.as_str()) && !is_measurement(profile, name)
        })
        .collect();

    let method = profile.method();
    let mut records = Vec::with_capacity(rows);
    for (i, utr) in utrs.into_iter().enumerate() {
        let mut record = SequenceRecord::new(
            utr,
            cds[i].as_str(),
            proteins.value(i),
            organisms.value(i),
            method,
            profile.temp,
            profile.paper.as_str(),
        );
        record.prot_mean = prot_mean.as_ref().map(|col| col[i]);
        record.prot_std = prot_std.as_ref().map(|col| col[i]);
        for (name, column) in &extras {
            let value = match column {
                Column::Numeric(values) => CellValue::Number(values[i]),
                Column::Text(values) => CellValue::Text(values[i].clone()),
            };
            record.extra.insert((*name).clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

fn is_measurement(profile: &ExperimentProfile, name: &str) -> bool {
    profile.prot_mean.as_deref() == Some(name) || profile.prot_std.as_deref() == Some(name)
}

fn assemble_utrs(
    assembly: &UtrAssembly,
    raw: &RawColumns,
    rows: usize,
) -> Result<Vec<String>, IngestError> {
    match assembly {
        UtrAssembly::Direct => Ok(raw.text(fields::UTR)?.to_vec()),
        UtrAssembly::Concat(parts) => {
            let columns = parts
                .iter()
                .map(|p| raw.text(p))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((0..rows)
                .map(|i| columns.iter().map(|col| col[i].as_str()).collect())
                .collect())
        }
        UtrAssembly::TranscribedLeader {
            promoter,
            tss,
            tail,
            suffix,
        } => {
            let promoters = raw.text(promoter)?;
            let starts = raw.numeric(tss)?;
            let tails = tail
                .iter()
                .map(|t| raw.text(t))
                .collect::<Result<Vec<_>, _>>()?;

            (0..rows)
                .map(|i| {
                    let start = round_offset(starts[i], tss)?;
                    let mut utr: String = promoters[i].chars().skip(start).collect();
                    for col in &tails {
                        utr.push_str(&col[i]);
                    }
                    utr.push_str(suffix);
                    Ok(utr)
                })
                .collect()
        }
    }
}

enum Resolved<'a> {
    Constant(&'a str),
    Column(&'a [String]),
}

impl<'a> Resolved<'a> {
    fn value(&self, row: usize) -> &'a str {
        match self {
            Resolved::Constant(v) => v,
            Resolved::Column(col) => col[row].as_str(),
        }
    }
}

fn resolve_field<'a>(
    source: &'a FieldSource,
    raw: &'a RawColumns,
) -> Result<Resolved<'a>, IngestError> {
    match source {
        FieldSource::Constant(v) => Ok(Resolved::Constant(v)),
        FieldSource::Column(name) => Ok(Resolved::Column(raw.text(name)?)),
    }
}
