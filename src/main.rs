//! featurelens CLI entry point.

use clap::Parser;
use featurelens::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so JSON on stdout stays clean. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.command.verbose());

    let result = match &cli.command {
        Commands::Extract(args) => cli::run_extract(args),
        Commands::Init(args) => cli::run_init(args),
        Commands::Inspect(args) => cli::run_inspect(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
