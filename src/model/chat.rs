//! Conversation and direct-message document schemas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for conversations
pub const CONVERSATION_COLLECTION: &str = "conversations";
/// Collection name for direct messages
pub const MESSAGE_COLLECTION: &str = "directMessages";

/// Delivery status of a direct message. Monotonic: never regresses.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Position in the Sent -> Delivered -> Read progression
    pub fn stage(self) -> u8 {
        match self {
            MessageStatus::Sent => 0,
            MessageStatus::Delivered => 1,
            MessageStatus::Read => 2,
        }
    }
}

/// An unordered pair of participants
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// Exactly two participant IDs; order carries no meaning
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(a: String, b: String) -> Self {
        Self {
            id: super::new_id(),
            participant_ids: vec![a, b],
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == user_id)
    }

    /// The participant other than `user_id`
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participant_ids
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(String::as_str)
    }
}

/// Direct message document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    #[serde(default)]
    pub status: MessageStatus,
    /// Soft delete; the document remains addressable
    #[serde(default)]
    pub is_deleted: bool,
    /// Set only within the configured edit window from `created_at`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DirectMessage {
    pub fn new(conversation_id: String, sender_id: String, text: String) -> Self {
        Self {
            id: super::new_id(),
            conversation_id,
            sender_id,
            text,
            status: MessageStatus::Sent,
            is_deleted: false,
            edited_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_stages_monotonic() {
        assert!(MessageStatus::Sent.stage() < MessageStatus::Delivered.stage());
        assert!(MessageStatus::Delivered.stage() < MessageStatus::Read.stage());
    }

    #[test]
    fn test_other_participant() {
        let convo = Conversation::new("u1".into(), "u2".into());
        assert_eq!(convo.other_participant("u1"), Some("u2"));
        assert_eq!(convo.other_participant("u2"), Some("u1"));
        assert!(convo.involves("u1"));
        assert!(!convo.involves("u3"));
    }
}
