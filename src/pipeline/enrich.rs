//! Descriptor stage: a worker pool that downloads each surviving artifact's
//! POM, parses the project name and description out of it, and passes the
//! artifact on.
//!
//! The descriptor tree under the download root belongs to this stage alone;
//! it is deleted and rebuilt on every run. Artifacts without a POM asset and
//! descriptors that fail to download or parse still flow through, just
//! without the extra metadata.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::NexusClient;
use crate::model::Artifact;
use crate::pom;
use crate::progress::Progress;

use super::PipelineError;

/// Spawns the descriptor stage.
///
/// The returned task resets the download root first and fails the run when
/// that is impossible; everything after that point is best-effort per
/// artifact.
pub fn spawn(
    client: NexusClient,
    workers: usize,
    download_root: PathBuf,
    input: mpsc::UnboundedReceiver<Artifact>,
    output: mpsc::UnboundedSender<Artifact>,
    progress: Progress,
) -> JoinHandle<Result<(), PipelineError>> {
    tokio::spawn(async move {
        match tokio::fs::remove_dir_all(&download_root).await {
            Ok(()) => debug!(root = %download_root.display(), "cleared download root"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(PipelineError::download_root(&download_root, error)),
        }

        let queue = Arc::new(Mutex::new(input));
        let workers = workers.max(1);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let client = client.clone();
            let download_root = download_root.clone();
            let output = output.clone();
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let claimed = { queue.lock().await.recv().await };
                    let Some(mut artifact) = claimed else { break };

                    debug!(worker, artifact = %artifact.name, "fetching descriptor");
                    enrich_artifact(&client, &download_root, &mut artifact, &progress).await;
                    progress.artifact_completed();
                    let _ = output.send(artifact);
                }
            }));
        }

        for handle in handles {
            if let Err(error) = handle.await {
                warn!(error = %error, "descriptor worker failed");
            }
        }

        Ok(())
    })
}

/// Downloads and reads one artifact's POM, filling in the project name and
/// description when the descriptor yields them.
async fn enrich_artifact(
    client: &NexusClient,
    download_root: &Path,
    artifact: &mut Artifact,
    progress: &Progress,
) {
    let Some(pom_url) = artifact.pom_url.clone() else {
        return;
    };

    let path = download_root
        .join(&artifact.repository)
        .join(&artifact.group)
        .join(format!("{}.pom.xml", artifact.name));

    if let Err(error) = client.download_to_file(&pom_url, &path).await {
        warn!(url = %pom_url, error = %error, "descriptor download failed");
        progress.log(format!("Error downloading {pom_url}"));
        return;
    }

    match pom::read_summary(&path) {
        Ok(summary) => {
            if let Some(name) = summary.name {
                artifact.full_name = name;
            }
            if let Some(description) = summary.description {
                artifact.description = description;
            }
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "descriptor unreadable");
            progress.log(format!(
                "Error reading {} downloaded from: {pom_url}",
                path.display()
            ));
        }
    }
}
