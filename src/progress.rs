//! Run-wide progress accounting and the crawl log.
//!
//! Every stage reports through a cloneable [`Progress`] handle. Two actor
//! tasks own the mutable state: one keeps the counters and repaints the
//! single status line, the other appends to the crawl log file. Stages never
//! wait on either; updates travel over unbounded channels and the actors
//! drain them in arrival order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

/// Default crawl log file, truncated at the start of every run.
pub const DEFAULT_LOG_FILE: &str = "logs.log";

/// Aggregated counters at one point in the run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Repositories selected for crawling.
    pub total_repositories: u64,
    /// Repositories whose search pagination has finished.
    pub completed_repositories: u64,
    /// Artifacts that survived the snapshot filter.
    pub total_artifacts: u64,
    /// Artifacts dropped by deduplication.
    pub ignored_artifacts: u64,
    /// Artifacts that passed through the descriptor stage.
    pub completed_artifacts: u64,
    /// Surviving artifacts counted per repository name.
    pub artifacts_per_repository: BTreeMap<String, u64>,
}

impl ProgressSnapshot {
    /// Renders the status line shown while the crawl runs.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "{}/{} repositories ; {}/{}/{} artifacts",
            self.completed_repositories,
            self.total_repositories,
            self.completed_artifacts,
            self.ignored_artifacts,
            self.total_artifacts
        )
    }
}

enum Update {
    TotalRepositories(u64),
    RepositoryCompleted,
    ArtifactsFound { repository: String, count: u64 },
    ArtifactsIgnored(u64),
    ArtifactCompleted,
    Snapshot(oneshot::Sender<ProgressSnapshot>),
}

/// Cloneable handle feeding the progress actors.
///
/// Sends never block. Once the actors have shut down (after every handle is
/// dropped), further updates are silently discarded.
#[derive(Debug, Clone)]
pub struct Progress {
    updates: mpsc::UnboundedSender<Update>,
    lines: mpsc::UnboundedSender<String>,
}

impl Progress {
    /// Spawns the counter and log actors, truncating the log file at
    /// `log_path`.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the log file cannot be created.
    pub async fn spawn(log_path: &Path) -> std::io::Result<(Self, ProgressTasks)> {
        let log_file = File::create(log_path).await?;

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();

        let counters = tokio::spawn(run_counters(updates_rx));
        let logger = tokio::spawn(run_log_sink(lines_rx, log_file, log_path.to_path_buf()));

        Ok((
            Self {
                updates: updates_tx,
                lines: lines_tx,
            },
            ProgressTasks { counters, logger },
        ))
    }

    /// Records the number of repositories the crawl will visit.
    pub fn total_repositories(&self, total: u64) {
        let _ = self.updates.send(Update::TotalRepositories(total));
    }

    /// Records one fully paginated repository.
    pub fn repository_completed(&self) {
        let _ = self.updates.send(Update::RepositoryCompleted);
    }

    /// Records `count` artifacts surviving the snapshot filter in
    /// `repository`.
    pub fn artifacts_found(&self, repository: &str, count: u64) {
        let _ = self.updates.send(Update::ArtifactsFound {
            repository: repository.to_string(),
            count,
        });
    }

    /// Records artifacts dropped by deduplication.
    pub fn artifacts_ignored(&self, count: u64) {
        let _ = self.updates.send(Update::ArtifactsIgnored(count));
    }

    /// Records one artifact whose descriptor stage finished.
    pub fn artifact_completed(&self) {
        let _ = self.updates.send(Update::ArtifactCompleted);
    }

    /// Appends one line to the crawl log.
    pub fn log(&self, line: impl Into<String>) {
        let _ = self.lines.send(line.into());
    }

    /// Asks the counter actor for its current state.
    ///
    /// Returns `None` once the actor has shut down.
    pub async fn snapshot(&self) -> Option<ProgressSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.updates.send(Update::Snapshot(reply_tx)).ok()?;
        reply_rx.await.ok()
    }
}

/// Join handles for the two progress actors.
///
/// Hold on to this while the pipeline runs; once every [`Progress`] clone is
/// dropped, [`ProgressTasks::join`] collects the final counters.
#[derive(Debug)]
pub struct ProgressTasks {
    counters: JoinHandle<ProgressSnapshot>,
    logger: JoinHandle<()>,
}

impl ProgressTasks {
    /// Waits for both actors to drain and returns the final counters.
    pub async fn join(self) -> ProgressSnapshot {
        let snapshot = match self.counters.await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(error = %error, "progress counter task failed");
                ProgressSnapshot::default()
            }
        };
        if let Err(error) = self.logger.await {
            warn!(error = %error, "crawl log task failed");
        }
        snapshot
    }
}

async fn run_counters(mut updates: mpsc::UnboundedReceiver<Update>) -> ProgressSnapshot {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
    bar.set_style(
        ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let mut state = ProgressSnapshot::default();

    while let Some(update) = updates.recv().await {
        match update {
            Update::TotalRepositories(total) => state.total_repositories = total,
            Update::RepositoryCompleted => state.completed_repositories += 1,
            Update::ArtifactsFound { repository, count } => {
                *state.artifacts_per_repository.entry(repository).or_default() += count;
                state.total_artifacts += count;
            }
            Update::ArtifactsIgnored(count) => state.ignored_artifacts += count,
            Update::ArtifactCompleted => state.completed_artifacts += 1,
            Update::Snapshot(reply) => {
                // Queries do not repaint the line.
                let _ = reply.send(state.clone());
                continue;
            }
        }
        bar.set_message(state.status_line());
    }

    bar.finish();
    state
}

async fn run_log_sink(mut lines: mpsc::UnboundedReceiver<String>, mut file: File, path: PathBuf) {
    while let Some(line) = lines.recv().await {
        let record = format!("{line}\n");
        if let Err(error) = file.write_all(record.as_bytes()).await {
            warn!(path = %path.display(), error = %error, "failed to append to crawl log");
        }
    }
    if let Err(error) = file.flush().await {
        warn!(path = %path.display(), error = %error, "failed to flush crawl log");
    }
}
