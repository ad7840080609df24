//! Replay of the durable pending-mutation log after a restart

use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{info, warn};

use super::engine::CatalogEngine;
use super::outcome::Pending;
use super::state::{InFlight, Orphan};
use crate::error::{CatalogError, Result};
use crate::model::{MediaBlob, MediaRef, MediaSource, RetryableCreate};
use crate::storage::{BlobStore, CacheStore, CatalogTypes, PendingMutation, PendingOp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Logged mutations that were re-run
    pub resumed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Entries that could not be resumed and were dropped
    pub skipped: usize,
    /// Orphaned media objects purged on this pass
    pub purged: usize,
}

impl<S: CatalogTypes> CatalogEngine<S> {
    /// Re-run every mutation the log still holds, in log order, and wait
    /// for all of them to settle.
    pub async fn recover_pending(&self) -> Result<RecoveryReport> {
        let inner = &self.inner;
        inner.hydrate().await?;
        let log = inner
            .cache
            .drain_pending()
            .await
            .map_err(CatalogError::storage)?;

        let mut report = RecoveryReport::default();
        let mut outcomes: Vec<BoxFuture<'static, bool>> = Vec::new();
        for mutation in log {
            match self.resume(mutation).await {
                Some(outcome) => {
                    report.resumed += 1;
                    outcomes.push(outcome);
                }
                None => report.skipped += 1,
            }
        }

        for ok in join_all(outcomes).await {
            if ok {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        report.purged = self.retry_orphans().await?;
        info!(
            resumed = report.resumed,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "pending mutations recovered"
        );
        Ok(report)
    }

    /// Put one logged mutation back into memory and onto its lane.
    async fn resume(&self, mutation: PendingMutation) -> Option<BoxFuture<'static, bool>> {
        let inner = &self.inner;
        let lane = mutation.lane.clone();
        let id = mutation.id.clone();

        match &mutation.op {
            PendingOp::Create { entity, file_name } => {
                let media = match &entity.media {
                    MediaRef::Local { hash, content_type } => match inner.blobs.get(hash).await {
                        Ok(bytes) => MediaSource::Upload(MediaBlob {
                            bytes,
                            content_type: content_type.clone(),
                            file_name: file_name.clone(),
                            dimensions: entity.media_info.dimensions(),
                        }),
                        Err(err) => {
                            warn!(entity_id = %entity.id, error = %err, "local media lost, dropping pending create");
                            inner.with_state(|s| s.remove(&entity.id));
                            let _ = inner.cache.remove(&entity.id).await;
                            return None;
                        }
                    },
                    MediaRef::External { url, .. } => MediaSource::Link(url.clone()),
                    MediaRef::Stored(_) => {
                        warn!(entity_id = %entity.id, "pending create already has stored media, skipping");
                        return None;
                    }
                };
                self.relog(&mutation).await?;
                inner.with_state(|s| {
                    if s.get(&entity.id).is_none() {
                        s.put(entity.clone());
                    }
                    s.bind_lane(&lane, &entity.id);
                    s.creating.insert(lane.clone());
                });
                let retry = RetryableCreate {
                    draft: entity.draft(),
                    media,
                };
                let job = {
                    let inner = Arc::clone(inner);
                    let lane = lane.clone();
                    async move { inner.run_create(lane, retry, id).await }
                };
                Some(settle(self.spawn_on_lane(&lane, job)))
            }
            PendingOp::Update {
                entity_id,
                patch,
                previous,
            } => {
                let known = inner.with_state(|s| s.get(entity_id).is_some());
                if !known {
                    warn!(entity_id = %entity_id, "pending update for unknown entity, skipping");
                    return None;
                }
                self.relog(&mutation).await?;
                inner.with_state(|s| {
                    s.bind_lane(&lane, entity_id);
                    s.in_flight.entry(lane.clone()).or_default().push(InFlight {
                        mutation: id.clone(),
                        patch: patch.clone(),
                    })
                });
                let job = {
                    let inner = Arc::clone(inner);
                    let lane = lane.clone();
                    let (patch, previous) = (patch.clone(), previous.clone());
                    async move { inner.run_update(lane, patch, previous, id).await }
                };
                Some(settle(self.spawn_on_lane(&lane, job)))
            }
            PendingOp::Delete { entity } => {
                self.relog(&mutation).await?;
                inner.with_state(|s| {
                    s.remove(&entity.id);
                    s.bind_lane(&lane, &entity.id);
                    s.deleting.insert(lane.clone());
                });
                let _ = inner.cache.remove(&entity.id).await;
                let job = {
                    let inner = Arc::clone(inner);
                    let lane = lane.clone();
                    let entity = entity.clone();
                    async move { inner.run_delete(lane, entity, id).await }
                };
                Some(settle(self.spawn_on_lane(&lane, job)))
            }
            PendingOp::PurgeMedia { entity_id, media } => {
                self.relog(&mutation).await?;
                inner.with_state(|s| {
                    s.orphans.push(Orphan {
                        mutation: id,
                        entity_id: entity_id.clone(),
                        media: media.clone(),
                    })
                });
                // Purged by the retry_orphans pass that ends recovery
                Some(async { true }.boxed())
            }
        }
    }

    async fn relog(&self, mutation: &PendingMutation) -> Option<()> {
        match self.inner.cache.enqueue_pending(mutation).await {
            Ok(()) => Some(()),
            Err(err) => {
                warn!(mutation = %mutation.id, op = mutation.op.name(), error = %err, "could not re-log pending mutation");
                None
            }
        }
    }
}

fn settle<T: Send + 'static>(pending: Pending<T>) -> BoxFuture<'static, bool> {
    async move { pending.settled().await.is_ok() }.boxed()
}
