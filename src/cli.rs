use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vivacast")]
#[command(author, version, about = "Assembles and relays a continuous live broadcast")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, assemble, and overlay the broadcast without streaming it
    Prepare {
        /// Run spec file (JSON) describing the broadcast
        #[arg(required = true)]
        input: PathBuf,

        /// Directory for intermediate files
        #[arg(long, default_value = "work")]
        work_dir: PathBuf,

        /// Directory for the manifest and relay members
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },

    /// Stream a previously prepared broadcast to its destination
    Relay {
        /// Directory holding the prepared manifest and metadata
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },

    /// Prepare and relay in one go
    Run {
        /// Run spec file (JSON) describing the broadcast
        #[arg(required = true)]
        input: PathBuf,

        /// Directory for intermediate files
        #[arg(long, default_value = "work")]
        work_dir: PathBuf,

        /// Directory for the manifest and relay members
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },

    /// Probe a media file and print its duration
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
