//! Direct messaging commands

use serde_json::{json, Value};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::model::{
    Conversation, DirectMessage, MessageStatus, User, CONVERSATION_COLLECTION, MESSAGE_COLLECTION,
    USER_COLLECTION,
};
use crate::notify::NotifyEvent;
use crate::remote::{FieldOp, Filter};

use super::Gateway;

/// Send a direct message, creating the conversation on first contact
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub sender_id: String,
    pub recipient_id: String,
    pub text: String,
}

/// Move a message forward along Sent -> Delivered -> Read.
///
/// Only a participant of the message's conversation may advance it. A
/// transition to the current status is a no-op; a backwards transition is
/// rejected. Guarded inside the store transform so racing receipts cannot
/// regress the status.
#[derive(Debug, Clone)]
pub struct AdvanceMessageStatus {
    pub message_id: String,
    pub caller_id: String,
    pub status: MessageStatus,
}

/// Rewrite a message's text; sender only, within the edit window
#[derive(Debug, Clone)]
pub struct EditMessage {
    pub message_id: String,
    pub caller_id: String,
    pub text: String,
}

/// Soft-delete a message; sender only
#[derive(Debug, Clone)]
pub struct DeleteMessage {
    pub message_id: String,
    pub caller_id: String,
}

impl Gateway {
    pub async fn send_message(&self, cmd: SendMessage) -> Result<DirectMessage> {
        self.observed("send message", async {
            if cmd.sender_id == cmd.recipient_id {
                return Err(EngineError::Denied("cannot message yourself".into()));
            }
            if cmd.text.trim().is_empty() {
                return Err(EngineError::Denied("a message needs text".into()));
            }
            let sender: User = self.fetch(USER_COLLECTION, &cmd.sender_id).await?;
            let _recipient: User = self.fetch(USER_COLLECTION, &cmd.recipient_id).await?;

            let conversation = self
                .conversation_between(&cmd.sender_id, &cmd.recipient_id)
                .await?;

            let message = DirectMessage::new(
                conversation.id.clone(),
                sender.id.clone(),
                cmd.text,
            );
            self.store()
                .insert(MESSAGE_COLLECTION, serde_json::to_value(&message)?)
                .await?;
            self.store()
                .apply(
                    CONVERSATION_COLLECTION,
                    &conversation.id,
                    vec![FieldOp::Set {
                        path: "lastMessageAt".into(),
                        value: json!(message.created_at),
                    }],
                )
                .await?;

            self.notifications()
                .dispatch(NotifyEvent::NewMessage {
                    actor_name: sender.display_name.clone(),
                    conversation_id: conversation.id.clone(),
                    recipient_id: cmd.recipient_id.clone(),
                })
                .await?;

            info!(conversation = conversation.id, "message sent");
            Ok(message)
        })
        .await
    }

    /// The conversation between two users, created on first use
    async fn conversation_between(&self, a: &str, b: &str) -> Result<Conversation> {
        let candidates = self
            .store()
            .list(
                CONVERSATION_COLLECTION,
                &Filter::Contains("participantIds".into(), json!(a)),
            )
            .await?;
        for doc in candidates {
            let convo: Conversation = serde_json::from_value(doc)?;
            if convo.involves(b) {
                return Ok(convo);
            }
        }
        let convo = Conversation::new(a.to_string(), b.to_string());
        self.store()
            .insert(CONVERSATION_COLLECTION, serde_json::to_value(&convo)?)
            .await?;
        Ok(convo)
    }

    pub async fn advance_message_status(&self, cmd: AdvanceMessageStatus) -> Result<()> {
        self.observed("advance message status", async {
            let message: DirectMessage = self.fetch(MESSAGE_COLLECTION, &cmd.message_id).await?;
            let conversation: Conversation = self
                .fetch(CONVERSATION_COLLECTION, &message.conversation_id)
                .await?;
            if !conversation.involves(&cmd.caller_id) {
                return Err(EngineError::Denied(
                    "only a participant may update message status".into(),
                ));
            }

            let next = cmd.status;
            self.store()
                .transform(
                    MESSAGE_COLLECTION,
                    &cmd.message_id,
                    Box::new(move |doc| {
                        let current: MessageStatus = doc
                            .get("status")
                            .cloned()
                            .map(serde_json::from_value)
                            .transpose()?
                            .unwrap_or_default();
                        if next.stage() == current.stage() {
                            return Ok(Vec::new());
                        }
                        if next.stage() < current.stage() {
                            return Err(EngineError::Conflict(format!(
                                "message status cannot regress from {current:?} to {next:?}"
                            )));
                        }
                        Ok(vec![FieldOp::Set {
                            path: "status".into(),
                            value: serde_json::to_value(next)?,
                        }])
                    }),
                )
                .await?;
            Ok(())
        })
        .await
    }

    pub async fn edit_message(&self, cmd: EditMessage) -> Result<()> {
        self.observed("edit message", async {
            if cmd.text.trim().is_empty() {
                return Err(EngineError::Denied("a message needs text".into()));
            }
            let caller = cmd.caller_id.clone();
            let text = cmd.text.clone();
            let window = self.config().edit_window;
            self.store()
                .transform(
                    MESSAGE_COLLECTION,
                    &cmd.message_id,
                    Box::new(move |doc| {
                        if doc.get("senderId").and_then(Value::as_str) != Some(caller.as_str()) {
                            return Err(EngineError::Denied(
                                "only the sender may edit a message".into(),
                            ));
                        }
                        if doc.get("isDeleted").and_then(Value::as_bool) == Some(true) {
                            return Err(EngineError::Denied(
                                "cannot edit a deleted message".into(),
                            ));
                        }
                        let created_at: chrono::DateTime<chrono::Utc> = doc
                            .get("createdAt")
                            .cloned()
                            .map(serde_json::from_value)
                            .transpose()?
                            .ok_or_else(|| {
                                EngineError::Serialization("message missing createdAt".into())
                            })?;
                        let age = chrono::Utc::now().signed_duration_since(created_at);
                        if age.to_std().unwrap_or_default() > window {
                            return Err(EngineError::Denied("edit window has closed".into()));
                        }
                        Ok(vec![
                            FieldOp::Set {
                                path: "text".into(),
                                value: json!(text),
                            },
                            FieldOp::Set {
                                path: "editedAt".into(),
                                value: json!(chrono::Utc::now()),
                            },
                        ])
                    }),
                )
                .await?;
            Ok(())
        })
        .await
    }

    pub async fn delete_message(&self, cmd: DeleteMessage) -> Result<()> {
        self.observed("delete message", async {
            let caller = cmd.caller_id.clone();
            self.store()
                .transform(
                    MESSAGE_COLLECTION,
                    &cmd.message_id,
                    Box::new(move |doc| {
                        if doc.get("senderId").and_then(Value::as_str) != Some(caller.as_str()) {
                            return Err(EngineError::Denied(
                                "only the sender may delete a message".into(),
                            ));
                        }
                        Ok(vec![FieldOp::Set {
                            path: "isDeleted".into(),
                            value: json!(true),
                        }])
                    }),
                )
                .await?;
            Ok(())
        })
        .await
    }
}
