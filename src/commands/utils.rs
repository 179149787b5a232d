use crate::table::flatten::FlatTable;
use crate::utils::config::SCHEMA_VERSION;

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Sim Trace Store Schemas");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Flat table (text, columnar, database backends):");
        println!("  {}", FlatTable::COLUMNS.join(", "));
        println!("  v1..v6 are nullable float64; unused slots are NULL");
        println!();
        println!("Normalized dataset (file-set, partitioned backends):");
        println!("  steps:  step_id, step_name");
        println!("  types:  type_id, type_name");
        println!("  frames: frame_id, step_id, frame_key");
        println!("  nodes:  node_id, type_id, frame_id, v1..v6");
        println!();
        println!("  step_id and type_id are assigned in first-seen order;");
        println!("  frame_id is unique across the whole dataset;");
        println!("  node_id is the sample's position within its (frame, type) group");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Sim Trace Store v{}", env!("CARGO_PKG_VERSION"));
    println!("Storage Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Tabular conversion and multi-backend storage for simulation traces.");
}
