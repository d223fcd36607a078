use arrow::array::{Array, ArrayRef, DictionaryArray, Float64Array, Int64Array, StringArray, UInt32Array};
use arrow::datatypes::{Field, Schema, UInt32Type};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::record::CellValue;
use crate::table::{CategoricalColumn, TableColumn, UnifiedTable};
use crate::utils::IngestError;

/// Build a RecordBatch holding the unified table
///
/// # Arguments
/// * `table` - Finished table from the aggregator
///
/// # Returns
/// * `Ok(RecordBatch)` - One Arrow column per table column, in table order
/// * `Err(IngestError)` - If building fails
///
/// Categorical columns become `Dictionary(UInt32, Utf8)`. Value columns
/// become Int64 when every present cell is an integer, Float64 when every
/// present cell is numeric (NaN kept), and Utf8 otherwise. Absent cells
/// are nulls.
pub fn build_table_batch(table: &UnifiedTable) -> Result<RecordBatch, IngestError> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for (name, column) in table.columns() {
        let array = match column {
            TableColumn::Categorical(c) => dictionary_array(c)?,
            TableColumn::Values(cells) => value_array(cells),
        };
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays)
        .map_err(|e| IngestError::ArrowError(format!("failed to create RecordBatch: {}", e)))
}

/// Build the unified table in Arrow IPC Stream format
///
/// # Returns
/// * `Ok(Vec<u8>)` - Arrow IPC Stream format bytes
/// * `Err(IngestError)` - If building fails
pub fn build_table_ipc(table: &UnifiedTable) -> Result<Vec<u8>, IngestError> {
    let batch = build_table_batch(table)?;
    serialize_to_ipc(batch.schema(), batch)
}

fn dictionary_array(column: &CategoricalColumn) -> Result<ArrayRef, IngestError> {
    let keys = UInt32Array::from(column.codes().to_vec());
    let values = Arc::new(StringArray::from(column.categories().to_vec())) as ArrayRef;
    let array = DictionaryArray::<UInt32Type>::try_new(keys, values).map_err(|e| {
        IngestError::ArrowError(format!("failed to create DictionaryArray: {}", e))
    })?;
    Ok(Arc::new(array))
}

fn value_array(cells: &[CellValue]) -> ArrayRef {
    let present = || cells.iter().filter(|c| !c.is_absent());

    if present().next().is_some() && present().all(|c| matches!(c, CellValue::Integer(_))) {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                CellValue::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        return Arc::new(Int64Array::from(values));
    }

    if present().all(|c| matches!(c, CellValue::Number(_) | CellValue::Integer(_))) {
        let values: Vec<Option<f64>> = cells.iter().map(CellValue::as_f64).collect();
        return Arc::new(Float64Array::from(values));
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| (!c.is_absent()).then(|| c.to_string()))
        .collect();
    Arc::new(StringArray::from(values))
}

/// Serialize RecordBatch to Arrow IPC Stream format
fn serialize_to_ipc(schema: Arc<Schema>, batch: RecordBatch) -> Result<Vec<u8>, IngestError> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, &schema).map_err(|e| {
            IngestError::ArrowError(format!("failed to create StreamWriter: {}", e))
        })?;
        writer
            .write(&batch)
            .map_err(|e| IngestError::ArrowError(format!("failed to write batch: {}", e)))?;
        writer
            .finish()
            .map_err(|e| IngestError::ArrowError(format!("failed to finish writer: {}", e)))?;
    }
    Ok(buffer)
}
