//! Search stage: a worker pool that paginates every discovered repository
//! and emits the artifacts surviving the snapshot filter.
//!
//! Workers pull repositories from a shared receiver, so a repository with
//! thousands of pages occupies one worker while the others keep claiming
//! fresh ones.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::{Artifact, Repository};
use crate::progress::Progress;
use crate::search::ArtifactSearch;

/// Spawns the search stage.
///
/// The returned task completes once every worker has joined; the artifact
/// sender is dropped at that point, which closes the downstream stage's
/// input.
pub fn spawn(
    search: ArtifactSearch,
    workers: usize,
    repositories: mpsc::UnboundedReceiver<Repository>,
    artifacts: mpsc::UnboundedSender<Artifact>,
    progress: Progress,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let queue = Arc::new(Mutex::new(repositories));
        let workers = workers.max(1);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let search = search.clone();
            let artifacts = artifacts.clone();
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    // Hold the lock only for the claim itself.
                    let claimed = { queue.lock().await.recv().await };
                    let Some(repository) = claimed else { break };

                    debug!(worker, repository = %repository.name, "searching repository");
                    crawl_repository(&search, &repository, &artifacts, &progress).await;
                    progress.repository_completed();
                }
            }));
        }

        for handle in handles {
            if let Err(error) = handle.await {
                warn!(error = %error, "search worker failed");
            }
        }
    })
}

/// Walks every search page of one repository.
///
/// A page the retry loop could not rescue ends this repository's chain; the
/// pool moves on rather than taking the whole run down.
async fn crawl_repository(
    search: &ArtifactSearch,
    repository: &Repository,
    artifacts: &mpsc::UnboundedSender<Artifact>,
    progress: &Progress,
) {
    let mut continuation_token: Option<String> = None;

    loop {
        let page = match search
            .fetch_page(&repository.name, continuation_token.as_deref(), progress)
            .await
        {
            Ok(page) => page,
            Err(error) => {
                warn!(
                    repository = %repository.name,
                    error = %error,
                    "abandoning repository after unrecoverable search error"
                );
                progress.log(format!(
                    "Giving up on repo {}: {error}",
                    repository.name
                ));
                return;
            }
        };

        let kept: Vec<Artifact> = page
            .artifacts
            .into_iter()
            .filter(|artifact| !artifact.is_snapshot())
            .collect();

        progress.artifacts_found(&repository.name, kept.len() as u64);
        for artifact in kept {
            let _ = artifacts.send(artifact);
        }

        match page.continuation_token {
            Some(token) => continuation_token = Some(token),
            None => return,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::NexusClient;
    use crate::progress::ProgressTasks;

    use super::*;

    fn repository(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            format: "maven2".to_string(),
            repo_type: "hosted".to_string(),
            url: format!("http://x/repository/{name}"),
        }
    }

    fn search_item(repository: &str, name: &str, version: &str) -> serde_json::Value {
        json!({
            "repository": repository,
            "group": "com.example",
            "name": name,
            "version": version,
            "assets": [
                { "downloadUrl": format!("http://x/{name}-{version}.jar") },
            ],
        })
    }

    async fn run_stage(
        server: &MockServer,
        repos: Vec<Repository>,
        workers: usize,
    ) -> (Vec<Artifact>, Progress, ProgressTasks, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (progress, tasks) = Progress::spawn(&dir.path().join("logs.log")).await.unwrap();

        let (repo_tx, repo_rx) = mpsc::unbounded_channel();
        let (artifact_tx, mut artifact_rx) = mpsc::unbounded_channel();
        for repo in repos {
            repo_tx.send(repo).unwrap();
        }
        drop(repo_tx);

        let search =
            ArtifactSearch::new(NexusClient::new(server.uri(), None, None), "jar", None);
        spawn(search, workers, repo_rx, artifact_tx, progress.clone())
            .await
            .unwrap();

        let mut collected = Vec::new();
        while let Some(artifact) = artifact_rx.recv().await {
            collected.push(artifact);
        }
        (collected, progress, tasks, dir)
    }

    #[tokio::test]
    async fn test_stage_paginates_until_token_runs_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search"))
            .and(query_param("repository", "releases"))
            .and(query_param("continuationToken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [search_item("releases", "beta", "2.0")],
                "continuationToken": null,
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search"))
            .and(query_param("repository", "releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [search_item("releases", "alpha", "1.0")],
                "continuationToken": "page2",
            })))
            .mount(&server)
            .await;

        let (collected, progress, tasks, _dir) =
            run_stage(&server, vec![repository("releases")], 2).await;

        let snapshot = progress.snapshot().await.unwrap();
        drop(progress);
        tasks.join().await;

        let mut names: Vec<&str> = collected.iter().map(|a| a.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(snapshot.completed_repositories, 1);
        assert_eq!(snapshot.total_artifacts, 2);
        assert_eq!(snapshot.artifacts_per_repository["releases"], 2);
    }

    #[tokio::test]
    async fn test_stage_filters_snapshot_artifacts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    search_item("releases", "lib", "1.0"),
                    search_item("releases", "lib-SNAPSHOT", "1.0"),
                    search_item("snapshots-internal", "other", "1.0"),
                ],
                "continuationToken": null,
            })))
            .mount(&server)
            .await;

        let (collected, progress, tasks, _dir) =
            run_stage(&server, vec![repository("releases")], 1).await;

        let snapshot = progress.snapshot().await.unwrap();
        drop(progress);
        tasks.join().await;

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].name, "lib");
        assert_eq!(snapshot.total_artifacts, 1);
    }

    #[tokio::test]
    async fn test_unrecoverable_error_skips_repository_but_not_the_pool() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search"))
            .and(query_param("repository", "broken"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search"))
            .and(query_param("repository", "releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [search_item("releases", "lib", "1.0")],
                "continuationToken": null,
            })))
            .mount(&server)
            .await;

        let (collected, progress, tasks, dir) = run_stage(
            &server,
            vec![repository("broken"), repository("releases")],
            2,
        )
        .await;

        let snapshot = progress.snapshot().await.unwrap();
        drop(progress);
        tasks.join().await;

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].repository, "releases");
        // Both repositories count as completed, readable or not.
        assert_eq!(snapshot.completed_repositories, 2);

        let log = std::fs::read_to_string(dir.path().join("logs.log")).unwrap();
        assert!(log.contains("Giving up on repo broken"));
    }

    #[tokio::test]
    async fn test_workers_share_the_repository_queue() {
        let server = MockServer::start().await;
        for name in ["r1", "r2", "r3", "r4"] {
            Mock::given(method("GET"))
                .and(path("/service/rest/v1/search"))
                .and(query_param("repository", name))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "items": [search_item(name, "lib", "1.0")],
                    "continuationToken": null,
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let repos = ["r1", "r2", "r3", "r4"]
            .into_iter()
            .map(repository)
            .collect();
        let (collected, progress, tasks, _dir) = run_stage(&server, repos, 2).await;

        let snapshot = progress.snapshot().await.unwrap();
        drop(progress);
        tasks.join().await;

        assert_eq!(collected.len(), 4);
        assert_eq!(snapshot.completed_repositories, 4);
        assert_eq!(snapshot.total_repositories, 0, "discovery owns the total");
    }
}
