//! CLI entry point for the nexus-harvest tool.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use nexus_harvest_core::progress::DEFAULT_LOG_FILE;
use nexus_harvest_core::{NexusClient, Progress, pipeline};
use tracing::info;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Diagnostics go to stderr; stdout belongs to the status line and the
    // end-of-run report.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(
        server = %args.server,
        extension = %args.extension,
        repository_type = %args.repository_type,
        "starting crawl"
    );

    let client = NexusClient::new(
        args.server.clone(),
        args.username.clone(),
        args.password.clone(),
    );
    let config = args.crawl_config();

    let (progress, progress_tasks) = Progress::spawn(Path::new(DEFAULT_LOG_FILE)).await?;

    let outcome = pipeline::run(client, config, progress.clone()).await;

    // Every pipeline handle is gone once run() returns; dropping ours lets
    // the progress actors drain and hand back the final counters.
    drop(progress);
    let snapshot = progress_tasks.join().await;

    for (repository, count) in &snapshot.artifacts_per_repository {
        println!("Found {count} artifacts in {repository}");
    }

    let written = outcome?;
    info!(written, report = %args.file.display(), "crawl finished");
    Ok(())
}
