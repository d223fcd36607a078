use std::collections::HashMap;
use tracing::{info, warn};

use crate::calibration::CalibrationTable;
use crate::catalog::Paper;
use crate::columns::RawColumns;
use crate::config::RunConfig;
use crate::flowseq::{apply_reconstruction, reconstruct, FlowSeqCounts};
use crate::normalizer::{normalize, ExperimentProfile};
use crate::record::{CellValue, SequenceRecord};
use crate::table::UnifiedTable;
use crate::utils::IngestError;

/// One experiment ready for ingestion: how to read it, its raw columns and,
/// for flow-seq experiments, its bin calibration
#[derive(Debug, Clone)]
pub struct Experiment {
    pub profile: ExperimentProfile,
    pub columns: RawColumns,
    pub calibration: Option<CalibrationTable>,
}

impl Experiment {
    pub fn new(paper: Paper, columns: RawColumns) -> Self {
        Self {
            profile: paper.profile(),
            columns,
            calibration: None,
        }
    }

    pub fn with_calibration(mut self, calibration: CalibrationTable) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Normalize the raw columns and, for flow-seq experiments, fill in the
    /// reconstructed estimates
    pub fn records(&self) -> Result<Vec<SequenceRecord>, IngestError> {
        let mut records = normalize(&self.profile, &self.columns)?;

        if let Some(layout) = &self.profile.flow_seq {
            let calibration = self.calibration.as_ref().ok_or_else(|| {
                IngestError::InvalidCalibration(format!(
                    "flow-seq experiment '{}' has no calibration table",
                    self.profile.paper
                ))
            })?;
            if calibration.paper != self.profile.paper {
                return Err(IngestError::InvalidCalibration(format!(
                    "calibration for '{}' given to experiment '{}'",
                    calibration.paper, self.profile.paper
                )));
            }
            let counts = FlowSeqCounts::from_columns(&self.columns, layout)?;
            let reconstruction = reconstruct(&counts, calibration)?;
            apply_reconstruction(&mut records, &reconstruction)?;
        }
        Ok(records)
    }
}

/// Rows contributed by one experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentSummary {
    pub paper: String,
    pub record_count: usize,
}

/// Outcome of ingesting a list of experiments
#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: Vec<ExperimentSummary>,
    /// Experiments that were skipped, with the reason
    pub failed: Vec<(String, IngestError)>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, paper: &str, error: IngestError) {
        warn!(paper = %paper, error = %error, "experiment skipped");
        self.failed.push((paper.to_string(), error));
    }
}

/// Accumulates experiments into one column-oriented table
///
/// Columns are the union of every field appended so far; a row that lacks a
/// field holds `CellValue::Absent` there.
#[derive(Debug, Default)]
pub struct Aggregator {
    columns: Vec<(String, Vec<CellValue>)>,
    index: HashMap<String, usize>,
    rows: usize,
    sources: Vec<ExperimentSummary>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Column names in order of first appearance
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn value(&self, row: usize, field: &str) -> Option<&CellValue> {
        let idx = *self.index.get(field)?;
        self.columns[idx].1.get(row)
    }

    /// Append records after the existing rows, keeping their order
    pub fn append(&mut self, records: Vec<SequenceRecord>) {
        for record in records {
            match self.sources.last_mut() {
                Some(last) if last.paper == record.paper => last.record_count += 1,
                _ => self.sources.push(ExperimentSummary {
                    paper: record.paper.clone(),
                    record_count: 1,
                }),
            }

            for (field, value) in record.to_row() {
                let idx = self.column_index(&field);
                self.columns[idx].1.push(value);
            }
            self.rows += 1;
            for (_, values) in &mut self.columns {
                if values.len() < self.rows {
                    values.push(CellValue::Absent);
                }
            }
        }
    }

    fn column_index(&mut self, field: &str) -> usize {
        if let Some(&idx) = self.index.get(field) {
            return idx;
        }
        let idx = self.columns.len();
        self.columns
            .push((field.to_string(), vec![CellValue::Absent; self.rows]));
        self.index.insert(field.to_string(), idx);
        idx
    }

    /// Ingest one experiment. Nothing is appended unless every row was
    /// normalized and reconstructed.
    pub fn ingest(&mut self, experiment: &Experiment) -> Result<usize, IngestError> {
        let records = experiment.records()?;
        let count = records.len();
        self.append(records);
        info!(paper = %experiment.profile.paper, rows = count, "experiment ingested");
        Ok(count)
    }

    /// Ingest experiments in order; a failing experiment is reported and
    /// skipped
    pub fn ingest_all<I>(&mut self, experiments: I) -> IngestReport
    where
        I: IntoIterator<Item = Experiment>,
    {
        let mut report = IngestReport::default();
        for experiment in experiments {
            let paper = experiment.profile.paper.clone();
            match self.ingest(&experiment) {
                Ok(record_count) => report.ingested.push(ExperimentSummary {
                    paper,
                    record_count,
                }),
                Err(e) => report.fail(&paper, e),
            }
        }
        report
    }

    /// Load and ingest every experiment listed in a run configuration
    pub fn ingest_configured(&mut self, config: &RunConfig) -> IngestReport {
        let mut report = IngestReport::default();
        for source in &config.experiments {
            let paper = source.paper.id();
            let outcome = config
                .load_experiment(source)
                .and_then(|experiment| self.ingest(&experiment));
            match outcome {
                Ok(record_count) => report.ingested.push(ExperimentSummary {
                    paper: paper.to_string(),
                    record_count,
                }),
                Err(e) => report.fail(paper, e),
            }
        }
        report
    }

    /// Row counts per appended experiment, in append order
    pub fn summary(&self) -> &[ExperimentSummary] {
        &self.sources
    }

    /// Intern categorical fields and derive the subgroup key
    pub fn finish(self) -> UnifiedTable {
        UnifiedTable::build(self.columns, self.rows)
    }
}
