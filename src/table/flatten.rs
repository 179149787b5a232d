//! Flatten a trace into the denormalized one-row-per-sample table.
//!
//! Row order follows trace traversal order (steps, then frames, then value
//! types, then nodes), all in source insertion order. Offset-based checks
//! downstream rely on that ordering, so it is a contract, not an accident.

use crate::table::values::{pad_values, ValueSlots};
use crate::trace::schema::RawTrace;
use crate::utils::config::VALUE_SLOTS;
use crate::utils::error::SchemaError;
use log::debug;

/// One row of the flat table: one node sample with its natural keys
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub step_name: String,
    pub frame_key: String,
    pub value_type: String,
    pub values: ValueSlots,
}

/// The denormalized one-row-per-sample table
///
/// **Public** - consumed by the flat storage backends
#[derive(Debug, Clone, Default)]
pub struct FlatTable {
    pub rows: Vec<FlatRow>,
}

impl FlatTable {
    /// Column names, in on-disk order
    pub const COLUMNS: [&'static str; 3 + VALUE_SLOTS] = [
        "step_name",
        "frame_key",
        "value_type",
        "v1",
        "v2",
        "v3",
        "v4",
        "v5",
        "v6",
    ];

    /// Number of rows in the table
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns in the flat schema
    pub fn column_count() -> usize {
        Self::COLUMNS.len()
    }
}

/// Flatten a trace into the one-row-per-sample table
///
/// **Public** - main entry point for the flat representation
///
/// # Arguments
/// * `trace` - The parsed trace document
///
/// # Returns
/// The flat table, one row per node sample, in traversal order
///
/// # Errors
/// * `SchemaError::VectorTooLong` - a sample exceeds the fixed slot count;
///   the whole run aborts, no partial table is returned
pub fn flatten(trace: &RawTrace) -> Result<FlatTable, SchemaError> {
    let mut rows = Vec::new();

    for (step_name, frames) in &trace.steps {
        for (frame_key, frame_values) in frames {
            debug!("Flattening step '{}', frame '{}'", step_name, frame_key);

            for (value_type, samples) in frame_values {
                for sample in samples {
                    rows.push(FlatRow {
                        step_name: step_name.clone(),
                        frame_key: frame_key.clone(),
                        value_type: value_type.clone(),
                        values: pad_values(sample.components())?,
                    });
                }
            }
        }
    }

    debug!("Flattened {} rows", rows.len());

    Ok(FlatTable { rows })
}
