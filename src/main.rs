use clap::Parser;
use std::path::PathBuf;

mod aggregation;
mod client;
mod config;
mod error;
mod models;
mod output;
mod runner;
mod storage;

use crate::config::Config;
use crate::models::RunResults;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// Translation comparison CLI - translate text with several models and rank
/// the backend's evaluations of each translation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file
    run_file: PathBuf,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log every backend request
    #[arg(short, long)]
    verbose: bool,

    /// Only show stored translations and the stored comparisons for the
    /// configured messages
    #[arg(long)]
    history_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_file(&args.run_file)?;
    let mut runner = Runner::new(config)?;

    let results = if args.history_only {
        RunResults {
            translations: runner.stored_translations()?,
            comparisons: runner.history()?,
        }
    } else {
        runner.run().await?
    };

    output::print_results(&results, args.output);

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "translation_compare=debug"
    } else {
        "translation_compare=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
