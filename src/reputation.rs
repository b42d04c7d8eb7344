//! Reputation ledger - point awards tied to specific actions
//!
//! `award_points` increments lifetime and weekly counters together in one
//! atomic transform and emits a user-visible acknowledgement. Rank is a pure
//! projection over the entity store (`EntityStore::rank_of`), recomputed on
//! every read and never stored.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use crate::model::USER_COLLECTION;
use crate::remote::{DocumentStore, FieldOp};

// Fixed tariff
pub const POINTS_CREATE_RESOURCE: i64 = 25;
pub const POINTS_DELETE_RESOURCE: i64 = -25;
pub const POINTS_FULFILL_REQUEST: i64 = 50;
pub const POINTS_CREATE_FORUM_POST: i64 = 10;
pub const POINTS_CREATE_REQUEST: i64 = 5;
pub const POINTS_VERIFIED_ANSWER: i64 = 15;

/// Applies point deltas against the remote user document
#[derive(Clone)]
pub struct ReputationLedger {
    store: Arc<dyn DocumentStore>,
    events: EventBus,
}

impl ReputationLedger {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Atomically add `delta` to both lifetime and weekly points.
    ///
    /// Delta may be negative (content deletion). The acknowledgement event
    /// carries the delta and the reason label for the toast.
    pub async fn award_points(&self, user_id: &str, delta: i64, reason: &str) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        self.store
            .apply(
                USER_COLLECTION,
                user_id,
                vec![
                    FieldOp::Increment { path: "points".into(), by: delta },
                    FieldOp::Increment { path: "weeklyPoints".into(), by: delta },
                ],
            )
            .await?;

        info!(user = user_id, delta, reason, "points awarded");
        self.events.emit(EngineEvent::PointsAwarded {
            user_id: user_id.to_string(),
            delta,
            reason: reason.to_string(),
        });
        Ok(())
    }
}
