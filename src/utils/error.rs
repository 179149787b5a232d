//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while reading the raw trace document
#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read trace document: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("trace document is not valid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("trace document does not have the expected nested-mapping shape: {0}")]
    InvalidShape(String),
}

/// Errors raised when a trace violates the tabular schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("node sample has {len} components, at most {max} are allowed")]
    VectorTooLong { len: usize, max: usize },
}

/// Errors that can occur while writing or reading a stored dataset
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("database error: {0}")]
    DbError(#[from] rusqlite::Error),

    #[error("arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised for malformed batch queries
///
/// An empty *result* from a well-formed filter is not an error; these cover
/// filters that are malformed before any row is inspected.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("empty {0} filter")]
    EmptyFilter(&'static str),

    #[error("step '{0}' is not part of the dataset")]
    UnknownStep(String),

    #[error("value type '{0}' is not part of the dataset")]
    UnknownType(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
