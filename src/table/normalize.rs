//! Normalize a trace into four related tables.
//!
//! Steps and Types are deduplicated dictionaries with surrogate ids
//! assigned in first-seen order. Frames and Nodes are per-occurrence
//! records. The frame counter spans the whole trace, so a frame_id is
//! never reused across steps and every Node row joins unambiguously.

use crate::table::values::{pad_values, ValueSlots};
use crate::trace::schema::RawTrace;
use crate::utils::config::VALUE_SLOTS;
use crate::utils::error::SchemaError;
use indexmap::IndexMap;
use log::debug;

/// One row of the Step dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct StepRow {
    pub step_id: i64,
    pub step_name: String,
}

/// One row of the Type dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRow {
    pub type_id: i64,
    pub type_name: String,
}

/// One row of the Frame table
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub frame_id: i64,
    pub step_id: i64,
    pub frame_key: String,
}

/// One row of the Node table
///
/// `node_id` is the sample's ordinal position within its (frame, type)
/// group; it is not globally unique.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub node_id: i64,
    pub type_id: i64,
    pub frame_id: i64,
    pub values: ValueSlots,
}

/// The normalized four-table dataset
///
/// **Public** - consumed by the normalized storage backends
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub steps: Vec<StepRow>,
    pub types: Vec<TypeRow>,
    pub frames: Vec<FrameRow>,
    pub nodes: Vec<NodeRow>,
}

impl Dataset {
    /// Node table column names, in on-disk order
    pub const NODE_COLUMNS: [&'static str; 3 + VALUE_SLOTS] = [
        "node_id", "type_id", "frame_id", "v1", "v2", "v3", "v4", "v5", "v6",
    ];

    /// Number of columns in the node table
    pub fn node_column_count() -> usize {
        Self::NODE_COLUMNS.len()
    }
}

/// Builder state threaded through one normalization pass
///
/// Owns the global frame counter and the type dictionary so no counter
/// lives outside the traversal.
#[derive(Debug, Default)]
struct DatasetBuilder {
    steps: Vec<StepRow>,
    frames: Vec<FrameRow>,
    nodes: Vec<NodeRow>,
    type_ids: IndexMap<String, i64>,
    next_frame_id: i64,
}

impl DatasetBuilder {
    /// Record a step and return its surrogate id
    fn add_step(&mut self, step_name: &str) -> i64 {
        let step_id = self.steps.len() as i64;
        self.steps.push(StepRow {
            step_id,
            step_name: step_name.to_string(),
        });
        step_id
    }

    /// Record a frame and return its globally unique id
    ///
    /// The counter continues across step boundaries.
    fn add_frame(&mut self, step_id: i64, frame_key: &str) -> i64 {
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        self.frames.push(FrameRow {
            frame_id,
            step_id,
            frame_key: frame_key.to_string(),
        });
        frame_id
    }

    /// Resolve a value type to its id, assigning one on first sight
    fn resolve_type(&mut self, type_name: &str) -> i64 {
        if let Some(&type_id) = self.type_ids.get(type_name) {
            return type_id;
        }
        let type_id = self.type_ids.len() as i64;
        self.type_ids.insert(type_name.to_string(), type_id);
        type_id
    }

    /// Finish the pass, materializing the Type dictionary in first-seen order
    fn finish(self) -> Dataset {
        let types = self
            .type_ids
            .into_iter()
            .map(|(type_name, type_id)| TypeRow { type_id, type_name })
            .collect();

        Dataset {
            steps: self.steps,
            types,
            frames: self.frames,
            nodes: self.nodes,
        }
    }
}

/// Normalize a trace into the four-table dataset
///
/// **Public** - main entry point for the normalized representation
///
/// # Arguments
/// * `trace` - The parsed trace document
///
/// # Returns
/// The Step, Type, Frame and Node tables with stable surrogate ids
///
/// # Errors
/// * `SchemaError::VectorTooLong` - a sample exceeds the fixed slot count;
///   the whole run aborts, no partial dataset is returned
pub fn normalize(trace: &RawTrace) -> Result<Dataset, SchemaError> {
    let mut builder = DatasetBuilder::default();

    for (step_name, frames) in &trace.steps {
        let step_id = builder.add_step(step_name);

        for (frame_key, frame_values) in frames {
            let frame_id = builder.add_frame(step_id, frame_key);
            debug!(
                "Normalizing step '{}' (id {}), frame '{}' (id {})",
                step_name, step_id, frame_key, frame_id
            );

            for (type_name, samples) in frame_values {
                let type_id = builder.resolve_type(type_name);

                for (node_id, sample) in samples.iter().enumerate() {
                    builder.nodes.push(NodeRow {
                        node_id: node_id as i64,
                        type_id,
                        frame_id,
                        values: pad_values(sample.components())?,
                    });
                }
            }
        }
    }

    let dataset = builder.finish();
    debug!(
        "Normalized {} steps, {} types, {} frames, {} nodes",
        dataset.steps.len(),
        dataset.types.len(),
        dataset.frames.len(),
        dataset.nodes.len()
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> RawTrace {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_single_sample_dataset() {
        let trace = parse(r#"{"Step-1": {"0.0": {"U": [[1, 2, 3]]}}}"#);
        let dataset = normalize(&trace).unwrap();

        assert_eq!(
            dataset.steps,
            vec![StepRow {
                step_id: 0,
                step_name: "Step-1".to_string()
            }]
        );
        assert_eq!(
            dataset.types,
            vec![TypeRow {
                type_id: 0,
                type_name: "U".to_string()
            }]
        );
        assert_eq!(
            dataset.frames,
            vec![FrameRow {
                frame_id: 0,
                step_id: 0,
                frame_key: "0.0".to_string()
            }]
        );
        assert_eq!(dataset.nodes.len(), 1);
        let node = &dataset.nodes[0];
        assert_eq!((node.node_id, node.type_id, node.frame_id), (0, 0, 0));
        assert_eq!(&node.values[..3], &[1.0, 2.0, 3.0]);
        assert!(node.values[3..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_frame_ids_unique_across_steps() {
        // Both steps carry a frame keyed "0.0"; the ids must not collide
        let trace = parse(
            r#"{
                "Step-1": {"0.0": {"U": [1.0]}},
                "Step-2": {"0.0": {"U": [2.0]}}
            }"#,
        );
        let dataset = normalize(&trace).unwrap();

        assert_eq!(dataset.frames.len(), 2);
        assert_eq!(dataset.frames[0].frame_id, 0);
        assert_eq!(dataset.frames[1].frame_id, 1);
        assert_eq!(dataset.frames[0].frame_key, dataset.frames[1].frame_key);
        assert_eq!(dataset.nodes[0].frame_id, 0);
        assert_eq!(dataset.nodes[1].frame_id, 1);
    }

    #[test]
    fn test_type_ids_assigned_first_seen() {
        let trace = parse(
            r#"{
                "Step-1": {
                    "0.0": {"S": [1.0], "U": [2.0]},
                    "1.0": {"U": [3.0], "RF": [4.0]}
                }
            }"#,
        );
        let dataset = normalize(&trace).unwrap();

        let names: Vec<(&str, i64)> = dataset
            .types
            .iter()
            .map(|t| (t.type_name.as_str(), t.type_id))
            .collect();
        assert_eq!(names, vec![("S", 0), ("U", 1), ("RF", 2)]);

        // "U" in the second frame resolves to the id assigned in the first
        assert_eq!(dataset.nodes[2].type_id, 1);
    }

    #[test]
    fn test_normalization_is_reproducible() {
        let trace = parse(
            r#"{
                "Step-1": {"0.0": {"U": [1.0], "S": [2.0]}},
                "Step-2": {"0.5": {"S": [3.0]}}
            }"#,
        );
        let first = normalize(&trace).unwrap();
        let second = normalize(&trace).unwrap();

        assert_eq!(first.steps, second.steps);
        assert_eq!(first.types, second.types);
        assert_eq!(first.frames, second.frames);
        assert_eq!(first.nodes, second.nodes);
    }

    #[test]
    fn test_node_ids_restart_per_group() {
        let trace = parse(
            r#"{
                "Step-1": {"0.0": {"U": [1.0, 2.0], "S": [3.0, 4.0]}}
            }"#,
        );
        let dataset = normalize(&trace).unwrap();

        let ids: Vec<i64> = dataset.nodes.iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_empty_frame_still_recorded() {
        let trace = parse(r#"{"Step-1": {"0.0": {}}}"#);
        let dataset = normalize(&trace).unwrap();

        assert_eq!(dataset.frames.len(), 1);
        assert!(dataset.nodes.is_empty());
        assert!(dataset.types.is_empty());
    }

    #[test]
    fn test_oversized_sample_aborts() {
        let trace = parse(r#"{"Step-1": {"0.0": {"U": [[1, 2, 3, 4, 5, 6, 7]]}}}"#);
        assert!(normalize(&trace).is_err());
    }
}
