//! Data model for the raw nested trace document.
//!
//! A trace is a 3-level mapping: step name -> frame key -> value type ->
//! node samples. Iteration order matters: both table builders walk the
//! document in source insertion order, so the maps are `IndexMap`s.

use indexmap::IndexMap;
use serde::Deserialize;

/// A single node sample from the trace
///
/// Either one scalar or a short vector of numeric components.
/// A scalar behaves exactly like a length-1 vector downstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NodeSample {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl NodeSample {
    /// View the sample as a slice of components
    pub fn components(&self) -> &[f64] {
        match self {
            NodeSample::Scalar(value) => std::slice::from_ref(value),
            NodeSample::Vector(values) => values.as_slice(),
        }
    }
}

/// Node samples per value type within one frame, in source order
pub type FrameValues = IndexMap<String, Vec<NodeSample>>;

/// Frames within one step, keyed by frame key, in source order
pub type StepFrames = IndexMap<String, FrameValues>;

/// The raw nested trace document
///
/// **Public** - produced by the loader, consumed by both table builders
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawTrace {
    /// Steps in source order, keyed by step name
    pub steps: IndexMap<String, StepFrames>,
}

impl RawTrace {
    /// Total number of node samples across the whole trace
    pub fn total_samples(&self) -> usize {
        self.steps
            .values()
            .flat_map(|frames| frames.values())
            .flat_map(|values| values.values())
            .map(|samples| samples.len())
            .sum()
    }

    /// True when the trace contains no steps at all
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_behaves_like_length_one_vector() {
        let sample = NodeSample::Scalar(4.2);
        assert_eq!(sample.components(), &[4.2]);
    }

    #[test]
    fn test_vector_components() {
        let sample = NodeSample::Vector(vec![1.0, 2.0, 3.0]);
        assert_eq!(sample.components(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_total_samples() {
        let json = r#"{
            "Step-1": {"0.0": {"U": [[1.0, 2.0], 3.0], "S": [4.0]}},
            "Step-2": {"0.0": {"U": [[5.0]]}}
        }"#;
        let trace: RawTrace = serde_json::from_str(json).unwrap();
        assert_eq!(trace.total_samples(), 4);
        assert!(!trace.is_empty());
    }

    #[test]
    fn test_preserves_source_order() {
        let json = r#"{"Zulu": {}, "Alpha": {}, "Mike": {}}"#;
        let trace: RawTrace = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = trace.steps.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Mike"]);
    }
}
