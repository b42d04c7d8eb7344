//! Notification document schema
//!
//! Immutable once created except for the `is_read` flip. Scoped to exactly
//! one recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for notifications
pub const NOTIFICATION_COLLECTION: &str = "notifications";

/// Closed set of notification kinds
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// New resource from a followed user
    NewResource,
    /// New content matching a followed lecturer or course
    Subscription,
    /// New direct message in one of the recipient's conversations
    NewMessage,
    /// New forum post from a followed user
    NewForumPost,
    /// Reply to one of the recipient's posts
    NewReply,
    /// One of the recipient's requests was fulfilled
    RequestFulfilled,
}

/// Notification document
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub actor_name: String,
    pub body: String,

    // Contextual references; which ones are set depends on `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forum_post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient_id: String, kind: NotificationKind, actor_name: String, body: String) -> Self {
        Self {
            id: super::new_id(),
            recipient_id,
            kind,
            actor_name,
            body,
            resource_id: None,
            conversation_id: None,
            forum_post_id: None,
            comment_id: None,
            request_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_resource(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_conversation(mut self, conversation_id: &str) -> Self {
        self.conversation_id = Some(conversation_id.to_string());
        self
    }

    pub fn with_forum_post(mut self, post_id: &str) -> Self {
        self.forum_post_id = Some(post_id.to_string());
        self
    }

    pub fn with_comment(mut self, comment_id: &str) -> Self {
        self.comment_id = Some(comment_id.to_string());
        self
    }

    pub fn with_request(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_unread() {
        let n = Notification::new("u2".into(), NotificationKind::NewReply, "Ada".into(), "Ada replied".into());
        assert!(!n.is_read);
        assert_eq!(n.recipient_id, "u2");
    }

    #[test]
    fn test_context_builders() {
        let n = Notification::new("u2".into(), NotificationKind::NewResource, "Ada".into(), "new notes".into())
            .with_resource("r1");
        assert_eq!(n.resource_id.as_deref(), Some("r1"));
        assert!(n.conversation_id.is_none());
    }
}
