//! Entity store - the client-local cache of all synchronized collections
//!
//! Each slice is the latest authoritative snapshot delivered by the sync
//! mirror and is replaced wholesale, never patched. Lookups return `Option`:
//! a miss means "not synced yet", not an error, because there is no
//! cross-collection ordering guarantee. Derived values (ranks, unread
//! counts) are recomputed from the snapshot on every read and never stored.

use std::sync::RwLock;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::warn;

use crate::model::{
    Conversation, DirectMessage, ForumPost, MessageStatus, Notification, Report, Resource,
    ResourceRequest, User,
};
use crate::remote::JsonDoc;

/// Which mirrored slice changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    Users,
    Resources,
    ForumPosts,
    Requests,
    Conversations,
    Messages,
    Notifications,
    Reports,
}

/// Client-local cache of every synchronized collection
pub struct EntityStore {
    users: RwLock<Vec<User>>,
    resources: RwLock<Vec<Resource>>,
    forum_posts: RwLock<Vec<ForumPost>>,
    requests: RwLock<Vec<ResourceRequest>>,
    conversations: RwLock<Vec<Conversation>>,
    messages: RwLock<Vec<DirectMessage>>,
    notifications: RwLock<Vec<Notification>>,
    reports: RwLock<Vec<Report>>,
    changed_tx: broadcast::Sender<Slice>,
}

impl EntityStore {
    pub fn new(channel_capacity: usize) -> Self {
        let (changed_tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            users: RwLock::new(Vec::new()),
            resources: RwLock::new(Vec::new()),
            forum_posts: RwLock::new(Vec::new()),
            requests: RwLock::new(Vec::new()),
            conversations: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
            notifications: RwLock::new(Vec::new()),
            reports: RwLock::new(Vec::new()),
            changed_tx,
        }
    }

    /// Subscribe to slice-change ticks for reactive re-reads
    pub fn changed(&self) -> broadcast::Receiver<Slice> {
        self.changed_tx.subscribe()
    }

    /// Replace a slice with a fresh authoritative snapshot.
    ///
    /// Documents that fail to deserialize are skipped with a warning rather
    /// than poisoning the whole batch.
    pub fn replace(&self, slice: Slice, docs: Vec<JsonDoc>) {
        match slice {
            Slice::Users => *self.users.write().unwrap() = decode(docs, "users"),
            Slice::Resources => *self.resources.write().unwrap() = decode(docs, "resources"),
            Slice::ForumPosts => *self.forum_posts.write().unwrap() = decode(docs, "forumPosts"),
            Slice::Requests => *self.requests.write().unwrap() = decode(docs, "resourceRequests"),
            Slice::Conversations => {
                *self.conversations.write().unwrap() = decode(docs, "conversations")
            }
            Slice::Messages => *self.messages.write().unwrap() = decode(docs, "directMessages"),
            Slice::Notifications => {
                *self.notifications.write().unwrap() = decode(docs, "notifications")
            }
            Slice::Reports => *self.reports.write().unwrap() = decode(docs, "reports"),
        }
        let _ = self.changed_tx.send(slice);
    }

    /// Drop every cached slice. Called when the subscription set is torn
    /// down; the cache's lifetime is bounded by the active subscription.
    pub fn clear(&self) {
        self.users.write().unwrap().clear();
        self.resources.write().unwrap().clear();
        self.forum_posts.write().unwrap().clear();
        self.requests.write().unwrap().clear();
        self.conversations.write().unwrap().clear();
        self.messages.write().unwrap().clear();
        self.notifications.write().unwrap().clear();
        self.reports.write().unwrap().clear();
    }

    // ── Snapshot reads ──────────────────────────────────────────────────

    pub fn users(&self) -> Vec<User> {
        self.users.read().unwrap().clone()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources.read().unwrap().clone()
    }

    pub fn forum_posts(&self) -> Vec<ForumPost> {
        self.forum_posts.read().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests.read().unwrap().clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.read().unwrap().clone()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.read().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn resource(&self, id: &str) -> Option<Resource> {
        self.resources.read().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn forum_post(&self, id: &str) -> Option<ForumPost> {
        self.forum_posts.read().unwrap().iter().find(|p| p.id == id).cloned()
    }

    pub fn request(&self, id: &str) -> Option<ResourceRequest> {
        self.requests.read().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn conversation_with(&self, user_a: &str, user_b: &str) -> Option<Conversation> {
        self.conversations
            .read()
            .unwrap()
            .iter()
            .find(|c| c.involves(user_a) && c.involves(user_b))
            .cloned()
    }

    /// Messages of one conversation in storage order
    pub fn messages_in(&self, conversation_id: &str) -> Vec<DirectMessage> {
        self.messages
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub fn notifications_for(&self, recipient_id: &str) -> Vec<Notification> {
        self.notifications
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    // ── Derived projections (recomputed on every read) ──────────────────

    /// 1-based rank by lifetime points, descending; ties broken by user ID
    /// ascending for determinism. `None` when the user is not synced yet.
    pub fn rank_of(&self, user_id: &str) -> Option<usize> {
        let users = self.users.read().unwrap();
        let mut ordered: Vec<(&str, i64)> =
            users.iter().map(|u| (u.id.as_str(), u.points)).collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ordered.iter().position(|(id, _)| *id == user_id).map(|i| i + 1)
    }

    /// Users ordered for the leaderboard view
    pub fn leaderboard(&self) -> Vec<User> {
        let mut users = self.users();
        users.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id)));
        users
    }

    /// Unread notifications addressed to the user
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.notifications
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
            .count()
    }

    /// Messages addressed to the user (sent by the other party) that have
    /// not reached `Read`, excluding soft-deleted ones
    pub fn unread_messages(&self, user_id: &str) -> usize {
        let conversations = self.conversations.read().unwrap();
        let mine: Vec<&str> = conversations
            .iter()
            .filter(|c| c.involves(user_id))
            .map(|c| c.id.as_str())
            .collect();
        self.messages
            .read()
            .unwrap()
            .iter()
            .filter(|m| {
                mine.contains(&m.conversation_id.as_str())
                    && m.sender_id != user_id
                    && m.status != MessageStatus::Read
                    && !m.is_deleted
            })
            .count()
    }
}

fn decode<T: DeserializeOwned>(docs: Vec<JsonDoc>, collection: &str) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match serde_json::from_value(doc) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(collection, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_doc(id: &str, points: i64) -> JsonDoc {
        json!({
            "id": id,
            "email": format!("{id}@campus.edu"),
            "displayName": id,
            "points": points,
            "createdAt": "2026-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_rank_is_pure_projection_with_stable_ties() {
        let store = EntityStore::new(8);
        store.replace(
            Slice::Users,
            vec![user_doc("ub", 50), user_doc("ua", 50), user_doc("uc", 100)],
        );

        assert_eq!(store.rank_of("uc"), Some(1));
        // Tie at 50 points: ID ascending wins
        assert_eq!(store.rank_of("ua"), Some(2));
        assert_eq!(store.rank_of("ub"), Some(3));
        assert_eq!(store.rank_of("missing"), None);

        // A fresh snapshot reorders the projection immediately
        store.replace(Slice::Users, vec![user_doc("ub", 500), user_doc("uc", 100)]);
        assert_eq!(store.rank_of("ub"), Some(1));
    }

    #[test]
    fn test_undecodable_documents_are_skipped() {
        let store = EntityStore::new(8);
        store.replace(
            Slice::Users,
            vec![user_doc("ua", 1), json!({ "not": "a user" })],
        );
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn test_unread_counts() {
        let store = EntityStore::new(8);
        store.replace(
            Slice::Notifications,
            vec![
                json!({
                    "id": "n1", "recipientId": "u1", "kind": "NewReply",
                    "actorName": "Ada", "body": "x", "isRead": false,
                    "createdAt": "2026-01-01T00:00:00Z"
                }),
                json!({
                    "id": "n2", "recipientId": "u1", "kind": "NewMessage",
                    "actorName": "Ada", "body": "x", "isRead": true,
                    "createdAt": "2026-01-01T00:00:00Z"
                }),
                json!({
                    "id": "n3", "recipientId": "u2", "kind": "NewMessage",
                    "actorName": "Ada", "body": "x", "isRead": false,
                    "createdAt": "2026-01-01T00:00:00Z"
                }),
            ],
        );
        assert_eq!(store.unread_count("u1"), 1);
        assert_eq!(store.unread_count("u2"), 1);
        assert_eq!(store.unread_count("u3"), 0);
    }

    fn message_doc(id: &str, convo: &str, sender: &str, status: &str, deleted: bool) -> JsonDoc {
        json!({
            "id": id,
            "conversationId": convo,
            "senderId": sender,
            "text": "x",
            "status": status,
            "isDeleted": deleted,
            "createdAt": "2026-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_unread_messages_counts_only_the_other_party() {
        let store = EntityStore::new(8);
        store.replace(
            Slice::Conversations,
            vec![
                json!({
                    "id": "cv1", "participantIds": ["u1", "u2"],
                    "createdAt": "2026-01-01T00:00:00Z"
                }),
                json!({
                    "id": "cv2", "participantIds": ["u2", "u3"],
                    "createdAt": "2026-01-01T00:00:00Z"
                }),
            ],
        );
        store.replace(
            Slice::Messages,
            vec![
                message_doc("m1", "cv1", "u2", "Sent", false),
                // Already read
                message_doc("m2", "cv1", "u2", "Read", false),
                // Soft-deleted
                message_doc("m3", "cv1", "u2", "Sent", true),
                // u1's own message never counts against u1
                message_doc("m4", "cv1", "u1", "Sent", false),
                // A conversation u1 is not part of
                message_doc("m5", "cv2", "u3", "Sent", false),
            ],
        );

        assert_eq!(store.unread_messages("u1"), 1);
        assert_eq!(store.unread_messages("u2"), 2);
        assert_eq!(store.unread_messages("u3"), 0);
    }

    #[test]
    fn test_clear_drops_every_slice() {
        let store = EntityStore::new(8);
        store.replace(Slice::Users, vec![user_doc("ua", 1)]);
        store.clear();
        assert!(store.users().is_empty());
        assert_eq!(store.rank_of("ua"), None);
    }
}
