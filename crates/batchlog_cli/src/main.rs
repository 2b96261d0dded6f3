//! batchlog CLI
//!
//! Command-line tools for batch directories.
//!
//! # Commands
//!
//! - `inspect` - List segments with their size, age and item count
//! - `verify` - Decode every segment and report damaged ones
//! - `dump` - Print the records of one segment

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// batchlog command-line tools.
#[derive(Parser)]
#[command(name = "batchlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Meta block format (raw, json)
    #[arg(global = true, short, long, default_value = "raw")]
    meta: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the segments of a batch directory
    Inspect {
        /// Batch directory
        dir: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Decode every segment and report truncation or corruption
    Verify {
        /// Batch directory
        dir: PathBuf,
    },

    /// Print the records of a segment
    Dump {
        /// Segment file
        segment: PathBuf,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let meta_format = commands::meta_format(&cli.meta)?;

    match cli.command {
        Commands::Inspect { dir, format } => {
            commands::inspect::run(&dir, meta_format.as_ref(), &format)?;
        }
        Commands::Verify { dir } => {
            commands::verify::run(&dir, meta_format.as_ref())?;
        }
        Commands::Dump {
            segment,
            limit,
            format,
        } => {
            commands::dump::run(&segment, meta_format.as_ref(), limit, &format)?;
        }
        Commands::Version => {
            println!("batchlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("batchlog Core v{}", batchlog_core::VERSION);
        }
    }

    Ok(())
}
