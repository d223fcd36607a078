//! Genetic Systems Database - builds one unified table of 5'UTR/CDS
//! sequences and their measured expression from published experiments.
//!
//! Characterized experiments contribute protein measurements directly.
//! Flow-seq experiments are reconstructed from sorted read counts into RNA,
//! protein and translation-rate estimates before joining the table.

pub mod aggregator;
pub mod arrow_handler;
pub mod calibration;
pub mod catalog;
pub mod columns;
pub mod config;
pub mod flowseq;
pub mod normalizer;
pub mod record;
pub mod stats;
pub mod table;
pub mod utils;

pub use aggregator::{Aggregator, Experiment, IngestReport};
pub use calibration::CalibrationTable;
pub use catalog::Paper;
pub use columns::RawColumns;
pub use config::RunConfig;
pub use record::{CellValue, Method, SequenceRecord};
pub use stats::Statistics;
pub use table::UnifiedTable;
pub use utils::IngestError;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
