//! CLI command definitions
//!
//! Defines the clap commands for the conformance runner.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run test sources against a debugger
    Run {
        /// Test source file, or a directory searched for sources
        path: PathBuf,

        /// Shell command that starts the debugger (overrides config)
        #[arg(long, short)]
        debugger: Option<String>,

        /// Attach to a debugger listening on this address instead
        #[arg(long, conflicts_with = "debugger")]
        connect: Option<String>,

        /// Program under debug, when running a single source
        #[arg(long, short)]
        binary: Option<PathBuf>,

        /// Default expect timeout in seconds
        #[arg(long, short)]
        timeout: Option<u64>,

        /// Configuration file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the check script hidden in a source's comments
    Extract {
        /// Test source file
        path: PathBuf,
    },

    /// List the line tags of a source
    Tags {
        /// Test source file
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
