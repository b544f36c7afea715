//! Deduplication barrier: collapses versioned renames of the same artifact
//! and keeps the highest-ranked survivor per key.
//!
//! The stage must see the whole artifact stream before it can emit, so it
//! buffers survivors in a map keyed by `(repository, group, real name)` and
//! flushes once its input closes. A challenger replaces the incumbent only
//! when its [`Artifact::version_rank`] is strictly greater, which keeps the
//! first-seen artifact on ties. Survivors leave in key order, so the same
//! catalog always produces the same report.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::Artifact;
use crate::progress::Progress;

/// Spawns the deduplication stage.
///
/// Reports the number of artifacts it swallowed as ignored before emitting
/// the survivors.
pub fn spawn(
    mut input: mpsc::UnboundedReceiver<Artifact>,
    output: mpsc::UnboundedSender<Artifact>,
    progress: Progress,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen: u64 = 0;
        let mut survivors: BTreeMap<(String, String, String), Artifact> = BTreeMap::new();

        while let Some(artifact) = input.recv().await {
            seen += 1;
            match survivors.entry(artifact.dedup_key()) {
                Entry::Occupied(mut slot) => {
                    if artifact.version_rank() > slot.get().version_rank() {
                        slot.insert(artifact);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(artifact);
                }
            }
        }

        let kept = survivors.len() as u64;
        progress.artifacts_ignored(seen - kept);
        debug!(seen, kept, "deduplication complete");

        for artifact in survivors.into_values() {
            let _ = output.send(artifact);
        }
    })
}
