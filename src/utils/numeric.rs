use super::error::IngestError;

/// `a * ln(x)` with the convention that a zero weight contributes nothing,
/// even when `x` is zero. NaN weights still propagate.
pub fn weighted_log(a: f64, x: f64) -> f64 {
    if a == 0.0 {
        0.0
    } else {
        a * x.ln()
    }
}

/// Convert a numeric cell holding a sequence offset into an index
///
/// # Arguments
/// * `value` - Offset as read from a numeric column (may be fractional)
/// * `column` - Column name, used in the error message
///
/// # Returns
/// * `Ok(usize)` - The offset rounded to the nearest integer
/// * `Err(IngestError::SchemaMismatch)` - If the value is NaN, infinite or negative
pub fn round_offset(value: f64, column: &str) -> Result<usize, IngestError> {
    if !value.is_finite() || value < 0.0 {
        return Err(IngestError::SchemaMismatch(format!(
            "column '{}' holds invalid offset {}",
            column, value
        )));
    }
    Ok(value.round() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_log_zero_weight() {
        assert_eq!(weighted_log(0.0, 0.0), 0.0);
        assert_eq!(weighted_log(0.0, 1000.0), 0.0);
    }

    #[test]
    fn test_weighted_log_normal() {
        let v = weighted_log(0.5, 100.0);
        assert!((v - 0.5 * 100f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_log_nan_propagates() {
        assert!(weighted_log(f64::NAN, 10.0).is_nan());
    }

    #[test]
    fn test_round_offset() {
        assert_eq!(round_offset(12.0, "TSS").unwrap(), 12);
        assert_eq!(round_offset(11.6, "TSS").unwrap(), 12);
        assert_eq!(round_offset(0.0, "TSS").unwrap(), 0);
    }

    #[test]
    fn test_round_offset_invalid() {
        assert!(round_offset(-1.0, "TSS").is_err());
        assert!(round_offset(f64::NAN, "TSS").is_err());
        let err = round_offset(f64::INFINITY, "TSS").unwrap_err();
        assert!(err.to_string().contains("invalid offset"));
    }
}
