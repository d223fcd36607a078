use arrow::array::{ArrayRef, Float64Array, Int64Array, LargeStringArray, StringArray};
use arrow::datatypes::{DataType, Schema};
use arrow::ipc::reader::StreamReader;
use std::io::Cursor;
use std::sync::Arc;

use crate::columns::{Column, RawColumns};
use crate::utils::IngestError;

/// Parse an experiment's raw columns from Arrow IPC Stream format
///
/// # Arguments
/// * `name` - Experiment the columns belong to
/// * `data` - Raw bytes in Arrow IPC Stream format
///
/// # Returns
/// * `Ok(RawColumns)` with one column per schema field, batches concatenated
/// * `Err(IngestError)` if the stream is unreadable or holds unsupported types
///
/// Numeric nulls become NaN and text nulls become empty strings.
pub fn parse_raw_columns(name: impl Into<String>, data: &[u8]) -> Result<RawColumns, IngestError> {
    if data.is_empty() {
        return Err(IngestError::ArrowError("empty input data".to_string()));
    }

    let cursor = Cursor::new(data);
    let reader = StreamReader::try_new(cursor, None)
        .map_err(|e| IngestError::ArrowError(format!("failed to create StreamReader: {}", e)))?;

    let schema = reader.schema();
    validate_schema(schema.clone())?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|field| match field.data_type() {
            DataType::Utf8 | DataType::LargeUtf8 => Column::Text(Vec::new()),
            _ => Column::Numeric(Vec::new()),
        })
        .collect();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| IngestError::ArrowError(format!("failed to read batch: {}", e)))?;

        for (array, column) in batch.columns().iter().zip(columns.iter_mut()) {
            match column {
                Column::Numeric(values) => extend_numeric(array, values)?,
                Column::Text(values) => extend_text(array, values)?,
            }
        }
    }

    let mut raw = RawColumns::new(name);
    for (field, column) in schema.fields().iter().zip(columns) {
        raw.insert(field.name().clone(), column);
    }
    Ok(raw)
}

/// Every field must be Float64, Int64, Utf8 or LargeUtf8
fn validate_schema(schema: Arc<Schema>) -> Result<(), IngestError> {
    if schema.fields().is_empty() {
        return Err(IngestError::ArrowError("schema has no fields".to_string()));
    }

    for (idx, field) in schema.fields().iter().enumerate() {
        if !matches!(
            field.data_type(),
            DataType::Float64 | DataType::Int64 | DataType::Utf8 | DataType::LargeUtf8
        ) {
            return Err(IngestError::ArrowError(format!(
                "column '{}' at index {} has unsupported type {:?}",
                field.name(),
                idx,
                field.data_type()
            )));
        }
    }

    Ok(())
}

fn extend_numeric(array: &ArrayRef, values: &mut Vec<f64>) -> Result<(), IngestError> {
    if let Some(floats) = array.as_any().downcast_ref::<Float64Array>() {
        values.extend(floats.iter().map(|v| v.unwrap_or(f64::NAN)));
    } else if let Some(ints) = array.as_any().downcast_ref::<Int64Array>() {
        values.extend(ints.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)));
    } else {
        return Err(IngestError::ArrowError(
            "column is not Float64Array or Int64Array".to_string(),
        ));
    }
    Ok(())
}

fn extend_text(array: &ArrayRef, values: &mut Vec<String>) -> Result<(), IngestError> {
    if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
        values.extend(strings.iter().map(|v| v.unwrap_or_default().to_string()));
    } else if let Some(strings) = array.as_any().downcast_ref::<LargeStringArray>() {
        values.extend(strings.iter().map(|v| v.unwrap_or_default().to_string()));
    } else {
        return Err(IngestError::ArrowError(
            "column is not StringArray".to_string(),
        ));
    }
    Ok(())
}
