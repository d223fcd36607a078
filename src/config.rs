//! Run configuration: which experiments to ingest and where their files live.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::aggregator::Experiment;
use crate::calibration::CalibrationTable;
use crate::catalog::Paper;
use crate::columns::RawColumns;
use crate::utils::IngestError;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_OUTPUT: &str = "geneticsystems.arrow";

/// Where one experiment's extracted data lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSource {
    pub paper: Paper,
    /// CSV, JSON or Arrow IPC file with the raw columns
    pub columns: PathBuf,
    /// Calibration TOML, required for flow-seq papers
    #[serde(default)]
    pub calibration: Option<PathBuf>,
}

/// Top-level run configuration, read from TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Log filter used when `GSDB_LOG` is unset. Default: "info".
    pub log_level: Option<String>,
    /// Arrow IPC output path. Default: "geneticsystems.arrow".
    pub output: Option<PathBuf>,
    /// Experiments in ingestion order
    #[serde(rename = "experiment")]
    pub experiments: Vec<ExperimentSource>,
}

impl RunConfig {
    /// Parse a configuration; relative paths resolve against `base_dir`
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, IngestError> {
        let mut config: RunConfig = toml::from_str(text)
            .map_err(|e| IngestError::ConfigError(format!("invalid TOML: {}", e)))?;

        let mut seen = HashSet::new();
        for source in &mut config.experiments {
            if !seen.insert(source.paper) {
                return Err(IngestError::ConfigError(format!(
                    "paper '{}' is listed twice",
                    source.paper
                )));
            }
            source.columns = resolve(base_dir, &source.columns);
            source.calibration = source.calibration.as_deref().map(|p| resolve(base_dir, p));
        }
        config.output = config.output.as_deref().map(|p| resolve(base_dir, p));

        debug!(experiments = config.experiments.len(), "run configuration parsed");
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            IngestError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base_dir)
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn effective_output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    /// Read one experiment's raw columns and calibration from disk
    pub fn load_experiment(&self, source: &ExperimentSource) -> Result<Experiment, IngestError> {
        let columns = RawColumns::load(source.paper.id(), &source.columns)?;
        let mut experiment = Experiment::new(source.paper, columns);
        if let Some(path) = &source.calibration {
            experiment = experiment.with_calibration(CalibrationTable::load(path)?);
        }
        Ok(experiment)
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
