//! Sim Trace Store CLI
//!
//! Converts hierarchical simulation traces into tabular data and persists
//! them through interchangeable storage backends.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use sim_trace_store::commands::{convert, read_batch};
use sim_trace_store::commands::{display_schema, display_version, ConvertArgs, ReadBatchArgs};
use sim_trace_store::storage::BackendKind;
use sim_trace_store::utils::config::{DEFAULT_FRACTION, DEFAULT_SEED};

/// Sim Trace Store - tabular storage for simulation traces
#[derive(Parser, Debug)]
#[command(name = "sim-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a trace document into a stored table or dataset
    Convert {
        /// Path to the JSON trace document
        #[arg(short, long)]
        input: PathBuf,

        /// Destination path (file, directory or database file, per backend)
        #[arg(short, long)]
        dest: PathBuf,

        /// Storage engine to write with
        #[arg(short, long, value_enum)]
        backend: BackendKind,
    },

    /// Count stored rows matching a step/type membership filter
    ReadBatch {
        /// Path to the JSON trace document the destination was converted from
        #[arg(short, long)]
        input: PathBuf,

        /// Destination path previously written by convert
        #[arg(short, long)]
        dest: PathBuf,

        /// Storage engine to read with
        #[arg(short, long, value_enum)]
        backend: BackendKind,

        /// Explicit step names (default: sample)
        #[arg(long, value_delimiter = ',')]
        steps: Vec<String>,

        /// Explicit value type names (default: sample)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,

        /// Sampling fraction for sides without an explicit list
        #[arg(long, default_value_t = DEFAULT_FRACTION)]
        fraction: f64,

        /// Sampling seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Convert {
            input,
            dest,
            backend,
        } => {
            let args = ConvertArgs {
                input,
                destination: dest,
                backend,
            };

            convert::validate_args(&args)?;
            convert::execute_convert(args)?;
        }

        Commands::ReadBatch {
            input,
            dest,
            backend,
            steps,
            types,
            fraction,
            seed,
        } => {
            let args = ReadBatchArgs {
                input,
                destination: dest,
                backend,
                steps,
                types,
                fraction,
                seed,
            };

            read_batch::validate_args(&args)?;
            let result = read_batch::execute_read_batch(args)?;

            println!("Matched rows: {}", result.row_count);
            println!("Shape: {:?}", result.shape());
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
