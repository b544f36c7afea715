//! Repository discovery: one listing call, filtered down to the
//! repositories worth searching.

use tracing::{debug, info};

use crate::client::NexusClient;
use crate::model::Repository;
use crate::progress::Progress;

use super::PipelineError;

/// Fetches the repository listing and keeps maven2 repositories of the
/// requested type whose names do not advertise snapshots.
///
/// The kept count is reported as the run's repository total before
/// returning.
///
/// # Errors
///
/// Returns [`PipelineError::Discovery`] when the listing request fails;
/// the crawl has nothing to work on without it.
pub async fn discover(
    client: &NexusClient,
    repository_type: &str,
    progress: &Progress,
) -> Result<Vec<Repository>, PipelineError> {
    let all = client
        .list_repositories()
        .await
        .map_err(PipelineError::discovery)?;
    let listed = all.len();

    let selected: Vec<Repository> = all
        .into_iter()
        .filter(|repo| repo.repo_type == repository_type)
        .filter(|repo| repo.format == "maven2")
        .filter(|repo| !repo.is_snapshot())
        .collect();

    for repo in &selected {
        debug!(repository = %repo.name, url = %repo.url, "selected repository");
    }
    info!(
        listed,
        selected = selected.len(),
        repository_type,
        "repository discovery complete"
    );

    progress.total_repositories(selected.len() as u64);
    Ok(selected)
}
