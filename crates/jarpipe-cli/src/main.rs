//! Jarpipe CLI - Command-line utility for inspecting, repacking and merging
//! JAR archives.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use jarpipe_core::PipelineConfig;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let config = PipelineConfig::new().with_worker_threads(cli.threads.map(usize::from));
    let show_progress = !cli.quiet && !cli.json;

    let result = match &cli.command {
        cli::Commands::List(args) => commands::list::execute(args, &config, &*formatter),
        cli::Commands::Repack(args) => commands::repack::execute(args, &config, &*formatter),
        cli::Commands::Merge(args) => {
            commands::merge::execute(args, config, &*formatter, show_progress)
        }
        cli::Commands::Find(args) => commands::find::execute(args, &*formatter),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    };

    if let Err(err) = &result
        && cli.json
    {
        formatter.format_error(err);
    }
    result
}
