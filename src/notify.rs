//! Notification router - maps mutation completions to recipient-targeted
//! notification documents
//!
//! One notification document per recipient, created unread. Subscription
//! fan-out resolves recipients from the authoritative user collection, not
//! the local mirror, so routing is correct even before the mirror catches
//! up. Mark-all/clear-all are scoped by the query predicate
//! (`recipientId == caller`); there is no separate authorization check.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{
    Notification, NotificationKind, User, NOTIFICATION_COLLECTION, USER_COLLECTION,
};
use crate::remote::{DocumentStore, FieldOp, Filter};

/// A mutation-completion event routed into notifications
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    /// New resource; fans out to the author's subscribers
    NewResource {
        actor_id: String,
        actor_name: String,
        resource_id: String,
        title: String,
        course_code: String,
        lecturer_name: String,
    },
    /// New forum post; fans out to the author's subscribers
    NewForumPost {
        actor_id: String,
        actor_name: String,
        post_id: String,
        title: String,
        course_code: String,
    },
    /// Reply to a post; targets the post author
    NewReply {
        actor_name: String,
        post_id: String,
        reply_id: String,
        recipient_id: String,
    },
    /// Direct message; targets the conversation's other participant
    NewMessage {
        actor_name: String,
        conversation_id: String,
        recipient_id: String,
    },
    /// Request fulfilled; targets the requester
    RequestFulfilled {
        actor_name: String,
        request_id: String,
        resource_id: String,
        recipient_id: String,
    },
}

/// Creates and maintains notification documents
#[derive(Clone)]
pub struct NotificationRouter {
    store: Arc<dyn DocumentStore>,
}

impl NotificationRouter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Route one event; returns the number of notifications created
    pub async fn dispatch(&self, event: NotifyEvent) -> Result<usize> {
        let notifications = match &event {
            NotifyEvent::NewResource {
                actor_id,
                actor_name,
                resource_id,
                title,
                course_code,
                lecturer_name,
            } => {
                self.fan_out(
                    actor_id,
                    actor_name,
                    Some(lecturer_name.as_str()),
                    Some(course_code.as_str()),
                    NotificationKind::NewResource,
                    format!("{actor_name} shared \"{title}\""),
                )
                .await?
                .into_iter()
                .map(|n| n.with_resource(resource_id))
                .collect()
            }
            NotifyEvent::NewForumPost { actor_id, actor_name, post_id, title, course_code } => self
                .fan_out(
                    actor_id,
                    actor_name,
                    None,
                    Some(course_code.as_str()),
                    NotificationKind::NewForumPost,
                    format!("{actor_name} posted \"{title}\""),
                )
                .await?
                .into_iter()
                .map(|n| n.with_forum_post(post_id))
                .collect(),
            NotifyEvent::NewReply { actor_name, post_id, reply_id, recipient_id } => vec![
                Notification::new(
                    recipient_id.clone(),
                    NotificationKind::NewReply,
                    actor_name.clone(),
                    format!("{actor_name} replied to your post"),
                )
                .with_forum_post(post_id)
                .with_comment(reply_id),
            ],
            NotifyEvent::NewMessage { actor_name, conversation_id, recipient_id } => vec![
                Notification::new(
                    recipient_id.clone(),
                    NotificationKind::NewMessage,
                    actor_name.clone(),
                    format!("New message from {actor_name}"),
                )
                .with_conversation(conversation_id),
            ],
            NotifyEvent::RequestFulfilled { actor_name, request_id, resource_id, recipient_id } => {
                vec![Notification::new(
                    recipient_id.clone(),
                    NotificationKind::RequestFulfilled,
                    actor_name.clone(),
                    format!("{actor_name} fulfilled your resource request"),
                )
                .with_request(request_id)
                .with_resource(resource_id)]
            }
        };

        let count = notifications.len();
        for notification in notifications {
            self.store
                .insert(NOTIFICATION_COLLECTION, serde_json::to_value(notification)?)
                .await?;
        }
        debug!(count, "notifications dispatched");
        Ok(count)
    }

    /// Resolve subscription fan-out recipients: everyone following the
    /// acting user, the lecturer name, or the course code. The actor never
    /// notifies themselves; each recipient gets exactly one notification.
    /// A follow of the user keeps the content kind; lecturer/course matches
    /// are tagged `Subscription`.
    async fn fan_out(
        &self,
        actor_id: &str,
        actor_name: &str,
        lecturer: Option<&str>,
        course: Option<&str>,
        kind: NotificationKind,
        body: String,
    ) -> Result<Vec<Notification>> {
        let users = self.store.list(USER_COLLECTION, &Filter::All).await?;
        let mut out = Vec::new();
        for doc in users {
            let Ok(user) = serde_json::from_value::<User>(doc) else {
                continue;
            };
            if user.id == actor_id {
                continue;
            }
            let follows_user = user.subscriptions.users.contains(actor_id);
            let follows_topic = lecturer
                .is_some_and(|l| !l.is_empty() && user.subscriptions.lecturers.contains(l))
                || course.is_some_and(|c| !c.is_empty() && user.subscriptions.courses.contains(c));
            if follows_user || follows_topic {
                let kind = if follows_user { kind } else { NotificationKind::Subscription };
                out.push(Notification::new(
                    user.id,
                    kind,
                    actor_name.to_string(),
                    body.clone(),
                ));
            }
        }
        Ok(out)
    }

    /// Idempotent: `isRead` becomes true regardless of current value
    pub async fn mark_read(&self, notification_id: &str) -> Result<()> {
        self.store
            .apply(
                NOTIFICATION_COLLECTION,
                notification_id,
                vec![FieldOp::Set { path: "isRead".into(), value: json!(true) }],
            )
            .await
    }

    /// Mark every notification addressed to the caller as read
    pub async fn mark_all_read(&self, caller_id: &str) -> Result<u64> {
        let count = self
            .store
            .update_where(
                NOTIFICATION_COLLECTION,
                &Filter::FieldEq("recipientId".into(), json!(caller_id)),
                vec![FieldOp::Set { path: "isRead".into(), value: json!(true) }],
            )
            .await?;
        info!(caller = caller_id, count, "notifications marked read");
        Ok(count)
    }

    /// Delete every notification addressed to the caller
    pub async fn clear_all(&self, caller_id: &str) -> Result<u64> {
        let count = self
            .store
            .delete_where(
                NOTIFICATION_COLLECTION,
                &Filter::FieldEq("recipientId".into(), json!(caller_id)),
            )
            .await?;
        info!(caller = caller_id, count, "notifications cleared");
        Ok(count)
    }
}
