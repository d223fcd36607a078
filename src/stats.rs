use crate::record::CellValue;
use crate::table::{TableColumn, UnifiedTable};

/// Statistics over the defined values of one numeric column
#[derive(Debug, Clone)]
pub struct Statistics {
    pub field: String,
    /// Finite values
    pub count: usize,
    /// NaN, infinite or absent cells
    pub undefined: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl Statistics {
    /// Compute statistics for a numeric field of the unified table
    ///
    /// Returns `None` for unknown or categorical fields and for columns
    /// without a single finite value.
    pub fn compute(table: &UnifiedTable, field: &str) -> Option<Self> {
        let TableColumn::Values(cells) = table.column(field)? else {
            return None;
        };

        let mut values = Vec::with_capacity(cells.len());
        let mut undefined = 0;
        for cell in cells {
            match cell {
                CellValue::Text(_) => {}
                other => match other.as_f64() {
                    Some(v) if v.is_finite() => values.push(v),
                    _ => undefined += 1,
                },
            }
        }

        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Statistics {
            field: field.to_string(),
            count,
            undefined,
            mean,
            min,
            max,
            sum,
        })
    }
}

/// Rows where every listed field holds a finite number
///
/// This is how consumers drop rows whose reconstruction was undefined.
pub fn defined_rows(table: &UnifiedTable, fields: &[&str]) -> Vec<usize> {
    (0..table.len())
        .filter(|&row| {
            fields.iter().all(|field| {
                table
                    .value(row, field)
                    .and_then(|v| v.as_f64())
                    .is_some_and(f64::is_finite)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::record::{fields, FlowSeqEstimate, Method, SequenceRecord};

    fn record(prot_mean: Option<f64>, rate: Option<f64>) -> SequenceRecord {
        let mut r = SequenceRecord::new(
            "AAGG",
            "ATG",
            "sfGFP",
            "Escherichia coli",
            Method::FlowSeq,
            30.0,
            "Test_2020",
        );
        r.prot_mean = prot_mean;
        r.flow_seq = rate.map(|transl_rate| FlowSeqEstimate {
            rna_a: 1.0,
            rna_b: 1.0,
            rna: 1.0,
            rna_var: 0.0,
            prot_var: 0.0,
            transl_rate,
            transl_rate_var: 0.0,
        });
        r
    }

    fn create_test_table() -> UnifiedTable {
        let mut agg = Aggregator::new();
        agg.append(vec![
            record(Some(10.0), Some(10.0)),
            record(Some(20.0), Some(f64::NAN)),
            record(Some(30.0), None),
            record(Some(40.0), Some(f64::INFINITY)),
            record(Some(50.0), Some(50.0)),
        ]);
        agg.finish()
    }

    #[test]
    fn test_statistics_compute() {
        let table = create_test_table();
        let stats = Statistics::compute(&table, fields::PROT_MEAN).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.undefined, 0);
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.sum, 150.0);
    }

    #[test]
    fn test_statistics_skip_undefined() {
        let table = create_test_table();
        let stats = Statistics::compute(&table, fields::TRANSL_RATE).unwrap();

        assert_eq!(stats.count, 2);
        assert_eq!(stats.undefined, 3);
        assert_eq!(stats.mean, 30.0);
    }

    #[test]
    fn test_statistics_unavailable() {
        let table = create_test_table();
        assert!(Statistics::compute(&table, fields::PAPER).is_none());
        assert!(Statistics::compute(&table, "NO.SUCH.FIELD").is_none());
        assert!(Statistics::compute(&table, fields::UTR).is_none());
    }

    #[test]
    fn test_defined_rows() {
        let table = create_test_table();
        assert_eq!(defined_rows(&table, &[fields::TRANSL_RATE]), vec![0, 4]);
        assert_eq!(defined_rows(&table, &[fields::PROT_MEAN]), vec![0, 1, 2, 3, 4]);
        assert_eq!(defined_rows(&table, &[fields::PROT_MEAN, fields::RNA]), vec![0, 1, 3, 4]);
    }
}
