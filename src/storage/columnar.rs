//! Columnar (Parquet) storage for the flat table.
//!
//! Also hosts the Arrow schema and record-batch codecs shared with the
//! normalized file-set and partitioned backends.

use crate::storage::{write_file_atomic, BatchFilter, MatchResult, StorageBackend};
use crate::table::flatten::{flatten, FlatTable};
use crate::table::normalize::{FrameRow, NodeRow, StepRow, TypeRow};
use crate::table::values::slot_to_nullable;
use crate::trace::loader::load_trace;
use crate::utils::config::VALUE_SLOTS;
use crate::utils::error::{QueryError, StorageError};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Flat table stored as a single Parquet file
pub struct ColumnarTable;

// ---------------------------------------------------------------------------
// Shared Arrow codecs
// ---------------------------------------------------------------------------

/// Append the nullable `v1..v6` value fields to a schema definition
fn push_value_fields(fields: &mut Vec<Field>) {
    for slot in 1..=VALUE_SLOTS {
        fields.push(Field::new(format!("v{slot}"), DataType::Float64, true));
    }
}

/// Collect one value slot across rows into a nullable Float64 column
fn value_column<'a, I>(rows: I, slot: usize) -> ArrayRef
where
    I: Iterator<Item = &'a [f64; VALUE_SLOTS]>,
{
    let column: Float64Array = rows.map(|values| slot_to_nullable(values[slot])).collect();
    Arc::new(column)
}

/// Arrow schema of the flat table
pub(crate) fn flat_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new("step_name", DataType::Utf8, false),
        Field::new("frame_key", DataType::Utf8, false),
        Field::new("value_type", DataType::Utf8, false),
    ];
    push_value_fields(&mut fields);
    Arc::new(Schema::new(fields))
}

/// Encode the flat table as one record batch
pub(crate) fn flat_to_batch(table: &FlatTable) -> Result<RecordBatch, StorageError> {
    let steps: StringArray = table.rows.iter().map(|r| Some(r.step_name.as_str())).collect();
    let frames: StringArray = table.rows.iter().map(|r| Some(r.frame_key.as_str())).collect();
    let types: StringArray = table
        .rows
        .iter()
        .map(|r| Some(r.value_type.as_str()))
        .collect();

    let mut columns: Vec<ArrayRef> =
        vec![Arc::new(steps), Arc::new(frames), Arc::new(types)];
    for slot in 0..VALUE_SLOTS {
        columns.push(value_column(table.rows.iter().map(|r| &r.values), slot));
    }

    Ok(RecordBatch::try_new(flat_schema(), columns)?)
}

/// Arrow schema of the Step dictionary
pub(crate) fn steps_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("step_id", DataType::Int64, false),
        Field::new("step_name", DataType::Utf8, false),
    ]))
}

pub(crate) fn steps_to_batch(rows: &[StepRow]) -> Result<RecordBatch, StorageError> {
    let ids: Int64Array = rows.iter().map(|r| Some(r.step_id)).collect();
    let names: StringArray = rows.iter().map(|r| Some(r.step_name.as_str())).collect();
    Ok(RecordBatch::try_new(
        steps_schema(),
        vec![Arc::new(ids), Arc::new(names)],
    )?)
}

/// Arrow schema of the Type dictionary
pub(crate) fn types_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("type_id", DataType::Int64, false),
        Field::new("type_name", DataType::Utf8, false),
    ]))
}

pub(crate) fn types_to_batch(rows: &[TypeRow]) -> Result<RecordBatch, StorageError> {
    let ids: Int64Array = rows.iter().map(|r| Some(r.type_id)).collect();
    let names: StringArray = rows.iter().map(|r| Some(r.type_name.as_str())).collect();
    Ok(RecordBatch::try_new(
        types_schema(),
        vec![Arc::new(ids), Arc::new(names)],
    )?)
}

/// Arrow schema of the Frame table
pub(crate) fn frames_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("frame_id", DataType::Int64, false),
        Field::new("step_id", DataType::Int64, false),
        Field::new("frame_key", DataType::Utf8, false),
    ]))
}

pub(crate) fn frames_to_batch(rows: &[FrameRow]) -> Result<RecordBatch, StorageError> {
    let frame_ids: Int64Array = rows.iter().map(|r| Some(r.frame_id)).collect();
    let step_ids: Int64Array = rows.iter().map(|r| Some(r.step_id)).collect();
    let keys: StringArray = rows.iter().map(|r| Some(r.frame_key.as_str())).collect();
    Ok(RecordBatch::try_new(
        frames_schema(),
        vec![Arc::new(frame_ids), Arc::new(step_ids), Arc::new(keys)],
    )?)
}

/// Arrow schema of the Node table
pub(crate) fn nodes_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new("node_id", DataType::Int64, false),
        Field::new("type_id", DataType::Int64, false),
        Field::new("frame_id", DataType::Int64, false),
    ];
    push_value_fields(&mut fields);
    Arc::new(Schema::new(fields))
}

pub(crate) fn nodes_to_batch(rows: &[NodeRow]) -> Result<RecordBatch, StorageError> {
    let node_ids: Int64Array = rows.iter().map(|r| Some(r.node_id)).collect();
    let type_ids: Int64Array = rows.iter().map(|r| Some(r.type_id)).collect();
    let frame_ids: Int64Array = rows.iter().map(|r| Some(r.frame_id)).collect();

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(node_ids),
        Arc::new(type_ids),
        Arc::new(frame_ids),
    ];
    for slot in 0..VALUE_SLOTS {
        columns.push(value_column(rows.iter().map(|r| &r.values), slot));
    }

    Ok(RecordBatch::try_new(nodes_schema(), columns)?)
}

/// Write one record batch as a Parquet file
pub(crate) fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<(), StorageError> {
    let file = File::create(path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read all record batches from a Parquet file
pub(crate) fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StorageError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(batches)
}

/// Downcast a batch column to a string array
pub(crate) fn string_column<'a>(
    batch: &'a RecordBatch,
    index: usize,
) -> Result<&'a StringArray, StorageError> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            StorageError::InvalidDestination(format!("column {index} is not a string column"))
        })
}

/// Downcast a batch column to an int64 array
pub(crate) fn int64_column<'a>(
    batch: &'a RecordBatch,
    index: usize,
) -> Result<&'a Int64Array, StorageError> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| {
            StorageError::InvalidDestination(format!("column {index} is not an int64 column"))
        })
}

// ---------------------------------------------------------------------------
// Backend implementation
// ---------------------------------------------------------------------------

impl StorageBackend for ColumnarTable {
    fn convert(&self, input: &Path, destination: &Path) -> Result<(), StorageError> {
        let trace = load_trace(input)?;
        let table = flatten(&trace)?;
        let batch = flat_to_batch(&table)?;

        info!(
            "Writing {} flat rows as parquet to {}",
            table.len(),
            destination.display()
        );

        write_file_atomic(destination, |staged| write_parquet(&batch, staged))
    }

    fn read_batch(
        &self,
        destination: &Path,
        filter: &BatchFilter,
    ) -> Result<MatchResult, QueryError> {
        let step_names = filter.step_names();
        let type_names = filter.type_names();

        let mut row_count = 0;
        for batch in read_parquet(destination)? {
            let steps = string_column(&batch, 0)?;
            let types = string_column(&batch, 2)?;

            for i in 0..batch.num_rows() {
                if step_names.contains(steps.value(i)) && type_names.contains(types.value(i)) {
                    row_count += 1;
                }
            }
        }

        debug!("Columnar read matched {} rows", row_count);

        Ok(MatchResult {
            row_count,
            column_count: FlatTable::column_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::schema::RawTrace;
    use arrow::array::Array;

    #[test]
    fn test_flat_batch_round_trip() {
        let trace: RawTrace =
            serde_json::from_str(r#"{"Step-1": {"0.0": {"U": [[1, 2, 3], 4.0]}}}"#).unwrap();
        let table = flatten(&trace).unwrap();
        let batch = flat_to_batch(&table).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), FlatTable::column_count());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.parquet");
        write_parquet(&batch, &path).unwrap();

        let batches = read_parquet(&path).unwrap();
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 2);

        // Padding slots come back as nulls
        let values = batches[0]
            .column(3 + 1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(values.value(0), 2.0);
        assert!(values.is_null(1));
    }
}
