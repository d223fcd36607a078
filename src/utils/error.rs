use thiserror::Error;

/// Errors raised while ingesting one experiment into the unified table.
///
/// Every variant is experiment-scoped: the aggregator records the failure
/// and moves on to the next experiment. Undefined reconstructed values are
/// not errors; they travel through the numeric columns as NaN.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// Raw columns disagree in length, or a declared field is missing
    #[error("SchemaMismatch: {0}")]
    SchemaMismatch(String),
    /// A bin counted for a sequence has no entry in the paper's calibration
    #[error("CalibrationKeyMissing: bin '{bin}' is not calibrated for paper '{paper}'")]
    CalibrationKeyMissing { paper: String, bin: String },
    /// Calibration table is malformed or belongs to another paper
    #[error("InvalidCalibration: {0}")]
    InvalidCalibration(String),
    /// Arrow conversion failures (IPC reading/writing, unsupported types)
    #[error("ArrowError: {0}")]
    ArrowError(String),
    #[error("ConfigError: {0}")]
    ConfigError(String),
    #[error("IoError: {0}")]
    IoError(String),
}

impl IngestError {
    pub(crate) fn missing_column(experiment: &str, column: &str) -> Self {
        IngestError::SchemaMismatch(format!(
            "experiment '{}' has no raw column '{}'",
            experiment, column
        ))
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::SchemaMismatch("lengths differ".to_string());
        assert_eq!(err.to_string(), "SchemaMismatch: lengths differ");

        let err = IngestError::CalibrationKeyMissing {
            paper: "Kosuri_PNAS_2013".to_string(),
            bin: "BIN13".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "CalibrationKeyMissing: bin 'BIN13' is not calibrated for paper 'Kosuri_PNAS_2013'"
        );

        let err = IngestError::ArrowError("bad stream".to_string());
        assert_eq!(err.to_string(), "ArrowError: bad stream");
    }

    #[test]
    fn test_missing_column_message() {
        let err = IngestError::missing_column("Tian_NAR_2015", "CDS");
        assert_eq!(
            err.to_string(),
            "SchemaMismatch: experiment 'Tian_NAR_2015' has no raw column 'CDS'"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<IngestError>();
        assert_sync::<IngestError>();
    }
}
