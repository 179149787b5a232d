//! Normalized Parquet file-set storage, one file per table.
//!
//! The four tables land at `<destination>/{steps,types,frames,nodes}.parquet`.
//! Batch reads resolve step membership through the Frame table, then scan
//! the Node table on `frame_id` and `type_id`.

use crate::storage::columnar::{
    frames_to_batch, int64_column, nodes_to_batch, read_parquet, steps_to_batch, types_to_batch,
    write_parquet,
};
use crate::storage::{write_dir_atomic, BatchFilter, MatchResult, StorageBackend};
use crate::table::normalize::{normalize, Dataset};
use crate::trace::loader::load_trace;
use crate::utils::config::{FRAMES_FILE, NODES_FILE, STEPS_FILE, TYPES_FILE};
use crate::utils::error::{QueryError, StorageError};
use log::{debug, info};
use std::collections::HashSet;
use std::path::Path;

/// Normalized dataset stored as one columnar file per table
pub struct ColumnarFileSet;

impl ColumnarFileSet {
    /// Write all four tables into the staged dataset directory
    ///
    /// **Private** - internal write logic, runs against the staged path
    fn write_dataset(dataset: &Dataset, dir: &Path) -> Result<(), StorageError> {
        write_parquet(&steps_to_batch(&dataset.steps)?, &dir.join(STEPS_FILE))?;
        write_parquet(&types_to_batch(&dataset.types)?, &dir.join(TYPES_FILE))?;
        write_parquet(&frames_to_batch(&dataset.frames)?, &dir.join(FRAMES_FILE))?;
        write_parquet(&nodes_to_batch(&dataset.nodes)?, &dir.join(NODES_FILE))?;
        Ok(())
    }

    /// Resolve the frame ids belonging to the selected steps
    ///
    /// **Private** - the Frame-table half of the Node join
    fn selected_frame_ids(
        frames_path: &Path,
        step_ids: &HashSet<i64>,
    ) -> Result<HashSet<i64>, StorageError> {
        let mut frame_ids = HashSet::new();

        for batch in read_parquet(frames_path)? {
            let ids = int64_column(&batch, 0)?;
            let steps = int64_column(&batch, 1)?;

            for i in 0..batch.num_rows() {
                if step_ids.contains(&steps.value(i)) {
                    frame_ids.insert(ids.value(i));
                }
            }
        }

        Ok(frame_ids)
    }
}

impl StorageBackend for ColumnarFileSet {
    fn convert(&self, input: &Path, destination: &Path) -> Result<(), StorageError> {
        let trace = load_trace(input)?;
        let dataset = normalize(&trace)?;

        info!(
            "Writing normalized dataset ({} nodes) to {}",
            dataset.nodes.len(),
            destination.display()
        );

        write_dir_atomic(destination, |staged| Self::write_dataset(&dataset, staged))
    }

    fn read_batch(
        &self,
        destination: &Path,
        filter: &BatchFilter,
    ) -> Result<MatchResult, QueryError> {
        let step_ids = filter.step_ids();
        let type_ids = filter.type_ids();

        let frame_ids = Self::selected_frame_ids(&destination.join(FRAMES_FILE), &step_ids)?;
        debug!("{} frames belong to the selected steps", frame_ids.len());

        let mut row_count = 0;
        for batch in read_parquet(&destination.join(NODES_FILE))? {
            let node_type_ids = int64_column(&batch, 1)?;
            let node_frame_ids = int64_column(&batch, 2)?;

            for i in 0..batch.num_rows() {
                if type_ids.contains(&node_type_ids.value(i))
                    && frame_ids.contains(&node_frame_ids.value(i))
                {
                    row_count += 1;
                }
            }
        }

        debug!("File-set read matched {} rows", row_count);

        Ok(MatchResult {
            row_count,
            column_count: Dataset::node_column_count(),
        })
    }
}
