//! Debugger conformance runner
//!
//! Runs test sources whose comments hold check scripts against a debugger
//! speaking a line-oriented protocol such as GDB/MI.

use clap::Parser;
use conformance::common::logging;
use conformance::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "conformance", about = "Script-driven debugger conformance tests")]
#[command(version, long_about = None)]
struct Cli {
    /// Verbose output, including passing tests' transcripts
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write a trace log under the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_file {
        if let Some(path) = logging::init_file(cli.verbose) {
            tracing::info!("Writing trace log to {}", path.display());
        }
    } else {
        logging::init_cli(cli.verbose);
    }

    match cli::dispatch(cli.command, cli.verbose).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
