//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod convert;
pub mod read_batch;
pub mod utils;

// Re-export main command functions
pub use convert::{execute_convert, ConvertArgs};
pub use read_batch::{execute_read_batch, ReadBatchArgs};
pub use utils::{display_schema, display_version};
