//! Read-batch command implementation.
//!
//! The read-batch command:
//! 1. Loads the trace and normalizes it to get the step/type dictionaries
//! 2. Builds the membership filter (explicit lists, sampled, or mixed)
//! 3. Runs the backend's batch read against the stored destination

use crate::sampler::sample_rows;
use crate::storage::{BackendKind, BatchFilter, MatchResult};
use crate::table::normalize::{normalize, Dataset, StepRow, TypeRow};
use crate::trace::loader::load_trace;
use crate::utils::error::QueryError;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::path::PathBuf;

/// Arguments for the read-batch command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReadBatchArgs {
    /// Path to the JSON trace document the dataset was converted from;
    /// supplies the step/type dictionaries the filter is built against
    pub input: PathBuf,

    /// Destination path previously written by convert
    pub destination: PathBuf,

    /// Storage engine to read with
    pub backend: BackendKind,

    /// Explicit step names (empty = sample instead)
    pub steps: Vec<String>,

    /// Explicit value type names (empty = sample instead)
    pub types: Vec<String>,

    /// Sampling fraction for sides without an explicit list
    pub fraction: f64,

    /// Sampling seed
    pub seed: u64,
}

/// Validate read-batch arguments before doing any work
///
/// **Public** - called from main.rs before execute_read_batch
pub fn validate_args(args: &ReadBatchArgs) -> Result<()> {
    if !args.input.exists() {
        bail!("input trace does not exist: {}", args.input.display());
    }
    if !args.destination.exists() {
        bail!(
            "destination has not been converted yet: {}",
            args.destination.display()
        );
    }
    if !(args.fraction > 0.0 && args.fraction <= 1.0) {
        bail!("fraction must be in (0, 1], got {}", args.fraction);
    }
    Ok(())
}

/// Execute the read-batch command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Read-batch command arguments
///
/// # Returns
/// The structured match result; the caller decides how to surface it
///
/// # Errors
/// * Trace loading or schema violations
/// * `QueryError` for empty filters or names foreign to the dataset
/// * Storage read failures
pub fn execute_read_batch(args: ReadBatchArgs) -> Result<MatchResult> {
    let trace = load_trace(&args.input)
        .with_context(|| format!("failed to load trace {}", args.input.display()))?;
    let dataset = normalize(&trace).context("failed to normalize trace")?;

    let filter = build_filter(&dataset, &args)?;
    debug!(
        "Filter selects {} steps and {} value types",
        filter.steps().len(),
        filter.types().len()
    );

    info!(
        "Reading batch from {} with the {} backend",
        args.destination.display(),
        args.backend
    );

    let backend = args.backend.backend();
    let result = backend
        .read_batch(&args.destination, &filter)
        .with_context(|| format!("batch read from {} failed", args.destination.display()))?;

    info!(
        "Matched {} of the stored rows (shape {:?})",
        result.row_count,
        result.shape()
    );

    Ok(result)
}

/// Build the membership filter from explicit lists and/or sampling
///
/// **Private** - each side falls back to sampling when no list was given
fn build_filter(dataset: &Dataset, args: &ReadBatchArgs) -> Result<BatchFilter, QueryError> {
    let steps = if args.steps.is_empty() {
        sample_rows(&dataset.steps, args.fraction, args.seed)
    } else {
        resolve_steps(dataset, &args.steps)?
    };

    let types = if args.types.is_empty() {
        sample_rows(&dataset.types, args.fraction, args.seed)
    } else {
        resolve_types(dataset, &args.types)?
    };

    BatchFilter::new(steps, types)
}

/// Resolve explicit step names against the dataset's Step dictionary
///
/// **Private** - a name the dataset never saw is a caller error
fn resolve_steps(dataset: &Dataset, names: &[String]) -> Result<Vec<StepRow>, QueryError> {
    names
        .iter()
        .map(|name| {
            dataset
                .steps
                .iter()
                .find(|s| &s.step_name == name)
                .cloned()
                .ok_or_else(|| QueryError::UnknownStep(name.clone()))
        })
        .collect()
}

/// Resolve explicit type names against the dataset's Type dictionary
///
/// **Private** - a name the dataset never saw is a caller error
fn resolve_types(dataset: &Dataset, names: &[String]) -> Result<Vec<TypeRow>, QueryError> {
    names
        .iter()
        .map(|name| {
            dataset
                .types
                .iter()
                .find(|t| &t.type_name == name)
                .cloned()
                .ok_or_else(|| QueryError::UnknownType(name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::schema::RawTrace;

    fn dataset() -> Dataset {
        let trace: RawTrace = serde_json::from_str(
            r#"{
                "Step-1": {"0.0": {"U": [1.0], "S": [2.0]}},
                "Step-2": {"0.0": {"U": [3.0]}}
            }"#,
        )
        .unwrap();
        normalize(&trace).unwrap()
    }

    #[test]
    fn test_resolve_known_names() {
        let dataset = dataset();
        let steps = resolve_steps(&dataset, &["Step-2".to_string()]).unwrap();
        assert_eq!(steps[0].step_id, 1);

        let types = resolve_types(&dataset, &["S".to_string()]).unwrap();
        assert_eq!(types[0].type_id, 1);
    }

    #[test]
    fn test_unknown_step_is_query_error() {
        let dataset = dataset();
        let result = resolve_steps(&dataset, &["Step-9".to_string()]);
        assert!(matches!(result, Err(QueryError::UnknownStep(_))));
    }

    #[test]
    fn test_unknown_type_is_query_error() {
        let dataset = dataset();
        let result = resolve_types(&dataset, &["RF".to_string()]);
        assert!(matches!(result, Err(QueryError::UnknownType(_))));
    }
}
