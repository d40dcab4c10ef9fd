//! osmsync CLI
//!
//! Offline tools for OSM XML files.
//!
//! # Commands
//!
//! - `diff` - Compute the change batch between two `.osm` files
//! - `inspect` - Summarize an `.osm` or `.osc` file
//! - `merge` - Union two `.osm` files, merging histories
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Offline tools for OSM XML files.
#[derive(Parser)]
#[command(name = "osmsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the osmChange that turns PARENT into CHILD
    Diff {
        /// The original document
        parent: PathBuf,

        /// The edited document
        child: PathBuf,

        /// Write the osmChange here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize an .osm or .osc file
    Inspect {
        /// File to inspect
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Union two .osm files, merging histories of shared primitives
    Merge {
        /// First document
        first: PathBuf,

        /// Second document
        second: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff {
            parent,
            child,
            output,
        } => {
            commands::diff::run(&parent, &child, output.as_deref())?;
        }
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Merge {
            first,
            second,
            output,
        } => {
            commands::merge::run(&first, &second, &output)?;
        }
        Commands::Version => {
            println!("osmsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("osmsync core v{}", osmsync_core::VERSION);
        }
    }

    Ok(())
}
