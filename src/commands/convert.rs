//! Convert command implementation.
//!
//! The convert command:
//! 1. Validates arguments
//! 2. Selects the storage backend
//! 3. Loads the trace, builds the table or dataset, writes the destination

use crate::storage::BackendKind;
use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the convert command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// Path to the JSON trace document
    pub input: PathBuf,

    /// Destination path (file, directory or database file, per backend)
    pub destination: PathBuf,

    /// Storage engine to write with
    pub backend: BackendKind,
}

/// Validate convert arguments before doing any work
///
/// **Public** - called from main.rs before execute_convert
pub fn validate_args(args: &ConvertArgs) -> Result<()> {
    if !args.input.exists() {
        bail!("input trace does not exist: {}", args.input.display());
    }
    if args.destination.as_os_str().is_empty() {
        bail!("destination path is empty");
    }
    Ok(())
}

/// Execute the convert command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Convert command arguments
///
/// # Returns
/// Ok if the destination was fully rewritten
///
/// # Errors
/// * Trace loading or schema violations
/// * Storage write failures (the destination keeps its previous contents)
pub fn execute_convert(args: ConvertArgs) -> Result<()> {
    let start = Instant::now();

    info!(
        "Converting {} with the {} backend",
        args.input.display(),
        args.backend
    );

    let backend = args.backend.backend();
    backend
        .convert(&args.input, &args.destination)
        .with_context(|| {
            format!(
                "failed to convert {} into {}",
                args.input.display(),
                args.destination.display()
            )
        })?;

    info!(
        "Conversion to {} finished in {:.2?}",
        args.destination.display(),
        start.elapsed()
    );

    Ok(())
}
