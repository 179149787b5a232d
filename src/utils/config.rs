//! Configuration and constants for the CLI.

/// Current storage schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Fixed number of value slots per node sample
pub const VALUE_SLOTS: usize = 6;

/// Default sampling fraction for batch reads
pub const DEFAULT_FRACTION: f64 = 0.67;

/// Default sampling seed for batch reads
pub const DEFAULT_SEED: u64 = 0;

// File names used by the normalized file-set and partitioned backends
pub const STEPS_FILE: &str = "steps.parquet";
pub const TYPES_FILE: &str = "types.parquet";
pub const FRAMES_FILE: &str = "frames.parquet";
pub const NODES_FILE: &str = "nodes.parquet";

/// Directory holding the partitioned node table
pub const NODES_DIR: &str = "nodes";

/// File name of a node partition inside its `step_id=`/`frame_id=` directory
pub const PART_FILE: &str = "part-0.parquet";
