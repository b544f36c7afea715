//! Report stage: the single writer of the CSV report file.
//!
//! One line per artifact, ordered by repository, group and real name. The
//! upstream pool hands artifacts over in completion order, so the writer
//! drains its queue first and sorts before writing; two runs against the
//! same catalog produce the same bytes. The file is truncated when the
//! stage starts so a run that finds nothing still leaves an empty report
//! behind instead of last week's.

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::model::Artifact;

use super::PipelineError;

/// Spawns the report stage. The task resolves to the number of lines
/// written.
pub fn spawn(
    mut input: mpsc::UnboundedReceiver<Artifact>,
    path: PathBuf,
) -> JoinHandle<Result<u64, PipelineError>> {
    tokio::spawn(async move {
        let mut file = File::create(&path)
            .await
            .map_err(|e| PipelineError::report(&path, e))?;

        let mut artifacts = Vec::new();
        while let Some(artifact) = input.recv().await {
            artifacts.push(artifact);
        }
        // The dedup key is unique among survivors, so this order is total.
        artifacts.sort_by(|a, b| {
            (&a.repository, &a.group, &a.real_name).cmp(&(&b.repository, &b.group, &b.real_name))
        });

        for artifact in &artifacts {
            file.write_all(report_line(artifact).as_bytes())
                .await
                .map_err(|e| PipelineError::report(&path, e))?;
        }

        file.flush()
            .await
            .map_err(|e| PipelineError::report(&path, e))?;
        let written = artifacts.len() as u64;
        info!(written, path = %path.display(), "report written");
        Ok(written)
    })
}

/// Renders one report line, newline included.
///
/// The description is the only field that can carry free-form text, so the
/// characters that would break the line or the column split are each
/// replaced with a space.
fn report_line(artifact: &Artifact) -> String {
    let description = artifact.description.replace(['\n', '\t', '\r', ','], " ");
    format!(
        "{},{},{},{},{},{},{}\n",
        artifact.download_url,
        artifact.repository,
        artifact.group,
        artifact.name,
        artifact.version,
        artifact.full_name,
        description
    )
}
