//! Storage backends for the flat table and the normalized dataset.
//!
//! Every backend implements the same two operations: `convert`, which loads
//! a trace and atomically overwrites a destination with this backend's
//! representation, and `read_batch`, which counts the stored rows matching
//! a step/type membership filter. Backends hold no state between calls, so
//! swapping engines never touches calling code.

pub mod columnar;
pub mod database;
pub mod file_set;
pub mod partitioned;
pub mod text;

// Re-export the backend types
pub use columnar::ColumnarTable;
pub use database::EmbeddedDbTable;
pub use file_set::ColumnarFileSet;
pub use partitioned::PartitionedColumnarDataset;
pub use text::TextTable;

use crate::table::normalize::{StepRow, TypeRow};
use crate::utils::error::{QueryError, StorageError};
use log::debug;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Result of a batch read: how many rows matched, and the table shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// Rows whose step and value type both satisfied the filter
    pub row_count: usize,

    /// Columns in the stored table the rows came from
    pub column_count: usize,
}

impl MatchResult {
    /// The `(rows, columns)` shape of the match
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.column_count)
    }
}

/// Membership filter over steps and value types
///
/// Carries full dictionary rows, so flat backends can match on the natural
/// string identities while normalized backends match on surrogate ids from
/// the same filter value. Ids are only meaningful against the dataset they
/// were produced from; resolving a filter against one dataset and reading
/// another is a caller error this type cannot detect.
#[derive(Debug, Clone)]
pub struct BatchFilter {
    steps: Vec<StepRow>,
    types: Vec<TypeRow>,
}

impl BatchFilter {
    /// Build a filter from step and type dictionary rows
    ///
    /// # Errors
    /// * `QueryError::EmptyFilter` - either membership set is empty
    pub fn new(steps: Vec<StepRow>, types: Vec<TypeRow>) -> Result<Self, QueryError> {
        if steps.is_empty() {
            return Err(QueryError::EmptyFilter("step"));
        }
        if types.is_empty() {
            return Err(QueryError::EmptyFilter("type"));
        }
        Ok(Self { steps, types })
    }

    /// The selected step rows
    pub fn steps(&self) -> &[StepRow] {
        &self.steps
    }

    /// The selected type rows
    pub fn types(&self) -> &[TypeRow] {
        &self.types
    }

    /// Step membership by natural name (flat backends)
    pub fn step_names(&self) -> HashSet<&str> {
        self.steps.iter().map(|s| s.step_name.as_str()).collect()
    }

    /// Type membership by natural name (flat backends)
    pub fn type_names(&self) -> HashSet<&str> {
        self.types.iter().map(|t| t.type_name.as_str()).collect()
    }

    /// Step membership by surrogate id (normalized backends)
    pub fn step_ids(&self) -> HashSet<i64> {
        self.steps.iter().map(|s| s.step_id).collect()
    }

    /// Type membership by surrogate id (normalized backends)
    pub fn type_ids(&self) -> HashSet<i64> {
        self.types.iter().map(|t| t.type_id).collect()
    }
}

/// Common capability implemented by every storage engine
///
/// Both operations are single-shot batch jobs: no retries, no partial
/// results, errors propagate to the caller.
pub trait StorageBackend {
    /// Load the trace at `input`, build this backend's representation and
    /// overwrite `destination` with it
    ///
    /// Either the whole write succeeds or the destination is left exactly
    /// as it was before the call.
    fn convert(&self, input: &Path, destination: &Path) -> Result<(), StorageError>;

    /// Count the stored rows whose step and value type are both members of
    /// the filter
    ///
    /// Never mutates persisted state. A filter naming identities absent
    /// from the dataset yields a zero-row result, not an error.
    fn read_batch(&self, destination: &Path, filter: &BatchFilter)
        -> Result<MatchResult, QueryError>;
}

/// Storage engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Flat table as delimited text
    Text,
    /// Flat table as a single columnar file
    Columnar,
    /// Flat table in an embedded relational database
    Database,
    /// Normalized dataset, one columnar file per table
    FileSet,
    /// Normalized dataset with a physically partitioned node table
    Partitioned,
}

impl BackendKind {
    /// Construct the storage engine for this kind
    pub fn backend(&self) -> Box<dyn StorageBackend> {
        match self {
            BackendKind::Text => Box::new(TextTable),
            BackendKind::Columnar => Box::new(ColumnarTable),
            BackendKind::Database => Box::new(EmbeddedDbTable),
            BackendKind::FileSet => Box::new(ColumnarFileSet),
            BackendKind::Partitioned => Box::new(PartitionedColumnarDataset),
        }
    }

    /// True for backends that store the normalized dataset
    pub fn is_normalized(&self) -> bool {
        matches!(self, BackendKind::FileSet | BackendKind::Partitioned)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Text => "text",
            BackendKind::Columnar => "columnar",
            BackendKind::Database => "database",
            BackendKind::FileSet => "file-set",
            BackendKind::Partitioned => "partitioned",
        };
        f.write_str(name)
    }
}

/// Stage-and-swap write for single-file destinations
///
/// The builder writes into a temporary file beside `destination`; only a
/// fully written file is renamed over the previous contents, so a failing
/// build leaves the destination untouched.
pub(crate) fn write_file_atomic<F>(destination: &Path, build: F) -> Result<(), StorageError>
where
    F: FnOnce(&Path) -> Result<(), StorageError>,
{
    let parent = parent_dir(destination)?;
    fs::create_dir_all(&parent)?;

    let staged = tempfile::Builder::new()
        .prefix(".staged-")
        .tempfile_in(&parent)?
        .into_temp_path();

    build(&staged)?;

    debug!("Swapping staged file into {}", destination.display());
    staged
        .persist(destination)
        .map_err(|e| StorageError::IoError(e.error))?;

    Ok(())
}

/// Stage-and-swap write for directory destinations
///
/// The builder populates a temporary sibling directory; on success the old
/// destination is moved aside, the staged directory takes its place, and
/// only then is the old content dropped.
pub(crate) fn write_dir_atomic<F>(destination: &Path, build: F) -> Result<(), StorageError>
where
    F: FnOnce(&Path) -> Result<(), StorageError>,
{
    let parent = parent_dir(destination)?;
    fs::create_dir_all(&parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".staged-")
        .tempdir_in(&parent)?;

    build(staging.path())?;

    debug!("Swapping staged directory into {}", destination.display());
    let staged = staging.into_path();

    if destination.exists() {
        let retired = tempfile::Builder::new()
            .prefix(".retired-")
            .tempdir_in(&parent)?;
        let retired_slot = retired.path().join("previous");

        fs::rename(destination, &retired_slot)?;
        if let Err(e) = fs::rename(&staged, destination) {
            // Put the previous contents back before surfacing the failure
            let _ = fs::rename(&retired_slot, destination);
            let _ = fs::remove_dir_all(&staged);
            return Err(e.into());
        }
        // `retired` cleans up the old contents on drop
    } else {
        fs::rename(&staged, destination)?;
    }

    Ok(())
}

fn parent_dir(destination: &Path) -> Result<std::path::PathBuf, StorageError> {
    if destination.as_os_str().is_empty() {
        return Err(StorageError::InvalidDestination(
            "destination path is empty".to_string(),
        ));
    }
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: i64, name: &str) -> StepRow {
        StepRow {
            step_id: id,
            step_name: name.to_string(),
        }
    }

    fn vtype(id: i64, name: &str) -> TypeRow {
        TypeRow {
            type_id: id,
            type_name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_step_filter_rejected() {
        let result = BatchFilter::new(vec![], vec![vtype(0, "U")]);
        assert!(matches!(result, Err(QueryError::EmptyFilter("step"))));
    }

    #[test]
    fn test_empty_type_filter_rejected() {
        let result = BatchFilter::new(vec![step(0, "Step-1")], vec![]);
        assert!(matches!(result, Err(QueryError::EmptyFilter("type"))));
    }

    #[test]
    fn test_filter_exposes_both_identities() {
        let filter = BatchFilter::new(
            vec![step(0, "Step-1"), step(2, "Step-3")],
            vec![vtype(1, "U")],
        )
        .unwrap();

        assert!(filter.step_names().contains("Step-3"));
        assert!(filter.step_ids().contains(&2));
        assert!(filter.type_names().contains("U"));
        assert!(filter.type_ids().contains(&1));
    }

    #[test]
    fn test_write_file_atomic_keeps_old_contents_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("table.csv");
        fs::write(&dest, "old contents").unwrap();

        let result = write_file_atomic(&dest, |_| {
            Err(StorageError::InvalidDestination("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old contents");
    }

    #[test]
    fn test_write_dir_atomic_keeps_old_contents_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dataset");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("marker"), "old").unwrap();

        let result = write_dir_atomic(&dest, |staging| {
            fs::write(staging.join("partial"), "new").unwrap();
            Err(StorageError::InvalidDestination("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(dest.join("marker")).unwrap(), "old");
        assert!(!dest.join("partial").exists());
    }

    #[test]
    fn test_write_dir_atomic_replaces_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dataset");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("stale"), "old").unwrap();

        write_dir_atomic(&dest, |staging| {
            fs::write(staging.join("fresh"), "new").unwrap();
            Ok(())
        })
        .unwrap();

        assert!(dest.join("fresh").exists());
        assert!(!dest.join("stale").exists());
    }
}
