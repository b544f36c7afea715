//! The staged artifact crawl.
//!
//! ```text
//! discovery -> search -> dedup -> descriptors -> report
//! ```
//!
//! Discovery runs inline so an unreachable server fails the run before
//! anything is spawned. Every later stage is a task wired to its neighbours
//! by unbounded channels; a stage closes its output by dropping the sender
//! once its own input is drained and its workers have joined. Search and
//! descriptor download fan out to worker pools that pull from a shared
//! receiver; dedup is a barrier that needs the whole stream before it can
//! emit; the report writer is the single owner of the output file.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{ClientError, NexusClient};
use crate::progress::Progress;
use crate::search::ArtifactSearch;

pub mod dedup;
pub mod discovery;
pub mod enrich;
pub mod output;
pub mod search;

/// Workers in each fan-out pool.
pub const DEFAULT_WORKERS: usize = 10;

/// Default report file.
pub const DEFAULT_OUTPUT_FILE: &str = "artifacts.csv";

/// Default descriptor download root.
pub const DEFAULT_DOWNLOAD_ROOT: &str = "poms";

/// Settings for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Artifact extension to select, e.g. `jar`.
    pub extension: String,
    /// Optional group filter forwarded to the search endpoint.
    pub group: Option<String>,
    /// Repository type to crawl, e.g. `hosted`.
    pub repository_type: String,
    /// Report file, truncated at the start of the run.
    pub output_file: PathBuf,
    /// Directory descriptors are downloaded under; deleted recursively when
    /// the descriptor stage starts.
    pub download_root: PathBuf,
    /// Workers in the search pool.
    pub search_workers: usize,
    /// Workers in the descriptor pool.
    pub enrich_workers: usize,
}

/// Errors that abort the crawl.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Repository discovery failed; nothing was crawled.
    #[error("repository discovery failed: {source}")]
    Discovery {
        /// The underlying API error.
        #[source]
        source: ClientError,
    },

    /// The descriptor download root could not be reset.
    #[error("failed to reset download root {path}: {source}")]
    DownloadRoot {
        /// The download root directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The report file could not be created or written.
    #[error("failed to write report {path}: {source}")]
    Report {
        /// The report file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A stage task panicked or was cancelled.
    #[error("pipeline stage {stage} failed: {source}")]
    Stage {
        /// Name of the stage that failed.
        stage: &'static str,
        /// The join error carrying the panic payload.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PipelineError {
    /// Creates a discovery error.
    pub fn discovery(source: ClientError) -> Self {
        Self::Discovery { source }
    }

    /// Creates a download root reset error.
    pub fn download_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DownloadRoot {
            path: path.into(),
            source,
        }
    }

    /// Creates a report writing error.
    pub fn report(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Report {
            path: path.into(),
            source,
        }
    }
}

/// Runs the full crawl and returns the number of report lines written.
///
/// # Errors
///
/// Returns [`PipelineError::Discovery`] when the repository listing cannot be
/// fetched, [`PipelineError::DownloadRoot`] when the descriptor root cannot
/// be reset, [`PipelineError::Report`] when the report file cannot be
/// written, and [`PipelineError::Stage`] when a stage task dies.
pub async fn run(
    client: NexusClient,
    config: CrawlConfig,
    progress: Progress,
) -> Result<u64, PipelineError> {
    let repositories =
        discovery::discover(&client, &config.repository_type, &progress).await?;

    let (repo_tx, repo_rx) = mpsc::unbounded_channel();
    let (found_tx, found_rx) = mpsc::unbounded_channel();
    let (unique_tx, unique_rx) = mpsc::unbounded_channel();
    let (enriched_tx, enriched_rx) = mpsc::unbounded_channel();

    for repository in repositories {
        let _ = repo_tx.send(repository);
    }
    drop(repo_tx);

    let artifact_search = ArtifactSearch::new(
        client.clone(),
        config.extension.clone(),
        config.group.clone(),
    );

    let search_stage = search::spawn(
        artifact_search,
        config.search_workers,
        repo_rx,
        found_tx,
        progress.clone(),
    );
    let dedup_stage = dedup::spawn(found_rx, unique_tx, progress.clone());
    let enrich_stage = enrich::spawn(
        client,
        config.enrich_workers,
        config.download_root.clone(),
        unique_rx,
        enriched_tx,
        progress.clone(),
    );
    let output_stage = output::spawn(enriched_rx, config.output_file.clone());

    join_stage("search", search_stage).await?;
    join_stage("dedup", dedup_stage).await?;
    join_stage("descriptors", enrich_stage).await??;
    join_stage("report", output_stage).await?
}

async fn join_stage<T>(stage: &'static str, handle: JoinHandle<T>) -> Result<T, PipelineError> {
    handle
        .await
        .map_err(|source| PipelineError::Stage { stage, source })
}
