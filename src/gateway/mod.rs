//! Mutation gateway - the validated entry point for all state changes
//!
//! Every mutation is a command object executed against the remote store
//! through atomic primitives; the store is the sole ordering authority.
//! Validation happens before any remote call; every failure is a typed
//! [`EngineError`] plus an `OperationFailed` event for the toast layer.
//! Nothing is retried automatically and no local state changes on failure -
//! the sync mirror reflects committed results only.

pub mod chat;
pub mod forum;
pub mod moderation;
pub mod profile;
pub mod requests;
pub mod resources;
pub mod vote;

pub use chat::{AdvanceMessageStatus, DeleteMessage, EditMessage, SendMessage};
pub use forum::{AddReply, CreateForumPost, MarkVerified};
pub use moderation::{FileReport, ReportResolution, ResolveReport, SetAdmin, SetUserStatus};
pub use profile::{SaveResource, Subscribe, SubscriptionTarget, UnsaveResource, Unsubscribe, UpdateProfile};
pub use requests::{CreateRequest, FulfillRequest};
pub use resources::{AddComment, CreateResource, DeleteResource};
pub use vote::{Vote, VoteDirection, VoteTarget};

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::external::AiAssistant;
use crate::model::{User, USER_COLLECTION};
use crate::notify::NotificationRouter;
use crate::remote::DocumentStore;
use crate::reputation::ReputationLedger;
use crate::store::EntityStore;

/// Aggregate of everything a mutation needs, passed by reference to the
/// presentation layer. Commands are plain structs executed through the
/// methods on this type.
pub struct Gateway {
    store: Arc<dyn DocumentStore>,
    entities: Arc<EntityStore>,
    router: NotificationRouter,
    ledger: ReputationLedger,
    config: EngineConfig,
    events: EventBus,
    ai: Option<Arc<dyn AiAssistant>>,
}

impl Gateway {
    pub fn new(store: Arc<dyn DocumentStore>, entities: Arc<EntityStore>, config: EngineConfig) -> Self {
        let events = EventBus::new(config.channel_capacity);
        Self {
            router: NotificationRouter::new(store.clone()),
            ledger: ReputationLedger::new(store.clone(), events.clone()),
            store,
            entities,
            config,
            events,
            ai: None,
        }
    }

    /// Attach the AI collaborator used to enrich resources after creation
    pub fn with_ai(mut self, ai: Arc<dyn AiAssistant>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn entities(&self) -> &Arc<EntityStore> {
        &self.entities
    }

    pub fn notifications(&self) -> &NotificationRouter {
        &self.router
    }

    pub(crate) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub(crate) fn ledger(&self) -> &ReputationLedger {
        &self.ledger
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn ai(&self) -> Result<&Arc<dyn AiAssistant>> {
        self.ai
            .as_ref()
            .ok_or(EngineError::Unavailable("AI collaborator not configured"))
    }

    /// Run a command body; failures additionally surface as a toast event
    pub(crate) async fn observed<T>(
        &self,
        context: &str,
        body: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match body.await {
            Ok(v) => Ok(v),
            Err(e) => {
                self.events.emit(EngineEvent::OperationFailed {
                    context: context.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch a typed document; absence is `NotFound`
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T> {
        let doc = self
            .store
            .get(collection, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("{collection}/{id}")))?;
        Ok(serde_json::from_value(doc)?)
    }

    /// Fetch the caller and require the admin flag
    pub(crate) async fn require_admin(&self, caller_id: &str) -> Result<User> {
        let caller: User = self.fetch(USER_COLLECTION, caller_id).await?;
        if !caller.is_admin {
            return Err(EngineError::Denied("admin privileges required".into()));
        }
        Ok(caller)
    }
}
