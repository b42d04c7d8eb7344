//! Sync mirror - live subscriptions keeping the entity store consistent
//!
//! One task per tracked collection. Each task watches the remote store with
//! a stable predicate and replaces the corresponding entity-store slice with
//! every delivered snapshot. Full-collection replacement sidesteps
//! local/remote ordering conflicts: the latest remote snapshot always wins.
//!
//! On subscription errors the slice freezes at its last-known value and the
//! watch is re-issued with the same predicate after a delay. Teardown goes
//! through a broadcast shutdown channel; the entity store is cleared with it
//! because the cache's lifetime is bounded by the active subscription set.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::model::{
    CONVERSATION_COLLECTION, FORUM_POST_COLLECTION, MESSAGE_COLLECTION, NOTIFICATION_COLLECTION,
    REPORT_COLLECTION, REQUEST_COLLECTION, RESOURCE_COLLECTION, USER_COLLECTION,
};
use crate::remote::{DocumentStore, Filter};
use crate::store::{EntityStore, Slice};

/// One tracked subscription: collection, stable predicate, target slice
struct Subscription {
    collection: &'static str,
    filter: Filter,
    slice: Slice,
}

/// The set of subscriptions for an authenticated viewer.
///
/// Collection-wide slices are shared by all viewers; conversations and
/// notifications are scoped to the viewer by the predicate itself.
fn subscription_plan(viewer_id: &str) -> Vec<Subscription> {
    vec![
        Subscription { collection: USER_COLLECTION, filter: Filter::All, slice: Slice::Users },
        Subscription { collection: RESOURCE_COLLECTION, filter: Filter::All, slice: Slice::Resources },
        Subscription { collection: FORUM_POST_COLLECTION, filter: Filter::All, slice: Slice::ForumPosts },
        Subscription { collection: REQUEST_COLLECTION, filter: Filter::All, slice: Slice::Requests },
        Subscription {
            collection: CONVERSATION_COLLECTION,
            filter: Filter::Contains("participantIds".into(), json!(viewer_id)),
            slice: Slice::Conversations,
        },
        Subscription { collection: MESSAGE_COLLECTION, filter: Filter::All, slice: Slice::Messages },
        Subscription {
            collection: NOTIFICATION_COLLECTION,
            filter: Filter::FieldEq("recipientId".into(), json!(viewer_id)),
            slice: Slice::Notifications,
        },
        Subscription { collection: REPORT_COLLECTION, filter: Filter::All, slice: Slice::Reports },
    ]
}

/// Sync mirror - owns the subscription tasks for one signed-in viewer
pub struct SyncMirror {
    store: Arc<dyn DocumentStore>,
    entities: Arc<EntityStore>,
    reconnect_delay: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncMirror {
    pub fn new(store: Arc<dyn DocumentStore>, entities: Arc<EntityStore>, reconnect_delay: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            entities,
            reconnect_delay,
            shutdown_tx,
        }
    }

    /// Start one subscription task per tracked collection
    pub fn start(&self, viewer_id: &str) -> Vec<JoinHandle<()>> {
        info!(viewer = viewer_id, "sync mirror starting");
        subscription_plan(viewer_id)
            .into_iter()
            .map(|sub| {
                let store = self.store.clone();
                let entities = self.entities.clone();
                let shutdown_rx = self.shutdown_tx.subscribe();
                let delay = self.reconnect_delay;
                tokio::spawn(async move {
                    run_subscription(store, entities, sub, shutdown_rx, delay).await;
                })
            })
            .collect()
    }

    /// Tear down every subscription and drop the mirrored cache
    pub fn stop(&self) {
        info!("sync mirror stopping");
        let _ = self.shutdown_tx.send(());
        self.entities.clear();
    }
}

async fn run_subscription(
    store: Arc<dyn DocumentStore>,
    entities: Arc<EntityStore>,
    sub: Subscription,
    mut shutdown_rx: broadcast::Receiver<()>,
    reconnect_delay: Duration,
) {
    loop {
        // Re-issuing the watch replays the current snapshot, so mutation
        // completions that landed while disconnected are picked up
        // idempotently.
        match store.watch(sub.collection, sub.filter.clone()).await {
            Ok(mut rx) => loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!(collection = sub.collection, "subscription shut down");
                        return;
                    }
                    batch = rx.recv() => match batch {
                        Ok(batch) => {
                            debug!(
                                collection = sub.collection,
                                revision = batch.revision,
                                docs = batch.docs.len(),
                                "snapshot applied"
                            );
                            entities.replace(sub.slice, batch.docs);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Batches are full snapshots; the next one
                            // supersedes everything missed.
                            warn!(collection = sub.collection, missed = n, "subscription lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!(collection = sub.collection, "subscription channel closed");
                            break;
                        }
                    }
                }
            },
            Err(e) => {
                // Slice freezes at last-known value until the re-issue succeeds
                error!(collection = sub.collection, error = %e, "watch failed");
            }
        }

        tokio::select! {
            _ = sleep(reconnect_delay) => {}
            _ = shutdown_rx.recv() => {
                debug!(collection = sub.collection, "shutdown during reconnect wait");
                return;
            }
        }
    }
}
