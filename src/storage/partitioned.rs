//! Partitioned normalized Parquet dataset.
//!
//! Dictionary tables live at the dataset root like the plain file-set; the
//! Node table is split into hive-style partition directories, one per
//! frame: `nodes/step_id=<s>/frame_id=<f>/part-0.parquet`. Reads open only
//! the partitions of selected frames instead of scanning every node row.

use crate::storage::columnar::{
    frames_to_batch, int64_column, nodes_to_batch, read_parquet, steps_to_batch, types_to_batch,
    write_parquet,
};
use crate::storage::{write_dir_atomic, BatchFilter, MatchResult, StorageBackend};
use crate::table::normalize::{normalize, Dataset, NodeRow};
use crate::trace::loader::load_trace;
use crate::utils::config::{FRAMES_FILE, NODES_DIR, PART_FILE, STEPS_FILE, TYPES_FILE};
use crate::utils::error::{QueryError, StorageError};
use indexmap::IndexMap;
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Normalized dataset with a physically partitioned node table
pub struct PartitionedColumnarDataset;

impl PartitionedColumnarDataset {
    /// Partition directory of one frame's node rows
    ///
    /// **Private** - single definition of the partition layout
    fn partition_path(root: &Path, step_id: i64, frame_id: i64) -> PathBuf {
        root.join(NODES_DIR)
            .join(format!("step_id={step_id}"))
            .join(format!("frame_id={frame_id}"))
    }

    /// Write the dictionary tables and the partitioned node table
    ///
    /// **Private** - internal write logic, runs against the staged path
    fn write_dataset(dataset: &Dataset, dir: &Path) -> Result<(), StorageError> {
        write_parquet(&steps_to_batch(&dataset.steps)?, &dir.join(STEPS_FILE))?;
        write_parquet(&types_to_batch(&dataset.types)?, &dir.join(TYPES_FILE))?;
        write_parquet(&frames_to_batch(&dataset.frames)?, &dir.join(FRAMES_FILE))?;

        let step_of_frame: HashMap<i64, i64> = dataset
            .frames
            .iter()
            .map(|f| (f.frame_id, f.step_id))
            .collect();

        // Group node rows per frame; normalization emits them in frame order
        let mut groups: IndexMap<i64, Vec<NodeRow>> = IndexMap::new();
        for node in &dataset.nodes {
            groups.entry(node.frame_id).or_default().push(node.clone());
        }

        for (frame_id, rows) in &groups {
            let step_id = step_of_frame.get(frame_id).copied().ok_or_else(|| {
                StorageError::InvalidDestination(format!(
                    "node rows reference frame {frame_id} missing from the frame table"
                ))
            })?;

            let partition = Self::partition_path(dir, step_id, *frame_id);
            fs::create_dir_all(&partition)?;
            write_parquet(&nodes_to_batch(rows)?, &partition.join(PART_FILE))?;
        }

        debug!("Wrote {} node partitions", groups.len());

        Ok(())
    }
}

impl StorageBackend for PartitionedColumnarDataset {
    fn convert(&self, input: &Path, destination: &Path) -> Result<(), StorageError> {
        let trace = load_trace(input)?;
        let dataset = normalize(&trace)?;

        info!(
            "Writing partitioned dataset ({} nodes) to {}",
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

        // Frame table join first, then open only the matching partitions
        let mut selected_frames: Vec<(i64, i64)> = Vec::new();
        for batch in read_parquet(&destination.join(FRAMES_FILE))? {
            let frame_col = int64_column(&batch, 0)?;
            let step_col = int64_column(&batch, 1)?;

            for i in 0..batch.num_rows() {
                if step_ids.contains(&step_col.value(i)) {
                    selected_frames.push((step_col.value(i), frame_col.value(i)));
                }
            }
        }

        debug!("Pruned to {} candidate partitions", selected_frames.len());

        let mut row_count = 0;
        for (step_id, frame_id) in selected_frames {
            let part = Self::partition_path(destination, step_id, frame_id).join(PART_FILE);
            if !part.exists() {
                // Frame had no node rows; no partition was written
                continue;
            }

            for batch in read_parquet(&part)? {
                let node_type_ids = int64_column(&batch, 1)?;
                for i in 0..batch.num_rows() {
                    if type_ids.contains(&node_type_ids.value(i)) {
                        row_count += 1;
                    }
                }
            }
        }

        debug!("Partitioned read matched {} rows", row_count);

        Ok(MatchResult {
            row_count,
            column_count: Dataset::node_column_count(),
        })
    }
}
