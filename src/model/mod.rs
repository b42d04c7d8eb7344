//! Typed document shapes for each synchronized collection
//!
//! One module per collection, mirroring the persisted layout. Documents are
//! stored remotely as JSON keyed by `id`; these structs (de)serialize at the
//! engine's edges with camelCase field names matching the remote layout.

pub mod chat;
pub mod forum;
pub mod notification;
pub mod report;
pub mod request;
pub mod resource;
pub mod user;

pub use chat::{Conversation, DirectMessage, MessageStatus, CONVERSATION_COLLECTION, MESSAGE_COLLECTION};
pub use forum::{ForumPost, ForumReply, FORUM_POST_COLLECTION};
pub use notification::{Notification, NotificationKind, NOTIFICATION_COLLECTION};
pub use report::{Report, ReportStatus, REPORT_COLLECTION};
pub use request::{Fulfillment, RequestStatus, ResourceRequest, REQUEST_COLLECTION};
pub use resource::{Comment, Flashcard, QuizQuestion, Resource, RESOURCE_COLLECTION};
pub use user::{Subscriptions, User, UserRole, UserStatus, USER_COLLECTION};

/// Generate a fresh document ID
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
