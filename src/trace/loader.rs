//! Trace document loader.
//!
//! Reads a UTF-8 JSON file and parses it into the nested trace model.
//! The loader has no side effects beyond the read.

use crate::trace::schema::RawTrace;
use crate::utils::error::InputError;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load and parse a trace document
///
/// **Public** - main entry point for trace loading
///
/// # Arguments
/// * `path` - Path to the JSON trace document
///
/// # Returns
/// The parsed trace with source iteration order preserved
///
/// # Errors
/// * `InputError::Unreadable` - File is missing or cannot be read
/// * `InputError::JsonError` - File is not valid JSON
/// * `InputError::InvalidShape` - JSON is valid but not the expected nested mapping
pub fn load_trace(path: impl AsRef<Path>) -> Result<RawTrace, InputError> {
    let path = path.as_ref();

    debug!("Loading trace document: {}", path.display());

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // Parse in two phases so a structurally wrong document is reported as a
    // shape problem rather than a generic JSON failure
    let document: serde_json::Value = serde_json::from_reader(reader)?;
    let trace: RawTrace = serde_json::from_value(document)
        .map_err(|e| InputError::InvalidShape(e.to_string()))?;

    debug!(
        "Loaded {} steps, {} node samples",
        trace.steps.len(),
        trace.total_samples()
    );

    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_trace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Step-1": {{"0.0": {{"U": [[1.0, 2.0, 3.0]]}}}}}}"#).unwrap();

        let trace = load_trace(file.path()).unwrap();
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.total_samples(), 1);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result = load_trace("does/not/exist.json");
        assert!(matches!(result, Err(InputError::Unreadable(_))));
    }

    #[test]
    fn test_invalid_json_is_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let result = load_trace(file.path());
        assert!(matches!(result, Err(InputError::JsonError(_))));
    }

    #[test]
    fn test_wrong_shape_is_invalid_shape() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Valid JSON, but samples are strings instead of numbers
        write!(file, r#"{{"Step-1": {{"0.0": {{"U": ["oops"]}}}}}}"#).unwrap();

        let result = load_trace(file.path());
        assert!(matches!(result, Err(InputError::InvalidShape(_))));
    }
}
