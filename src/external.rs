//! External collaborator contracts
//!
//! Auth, object storage and the AI text service are outside this engine;
//! these traits are what the core consumes. Implementations live with the
//! embedding application.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Flashcard, QuizQuestion};

/// What the presentation layer shows when the AI collaborator fails;
/// AI failures degrade, they never propagate to the caller
pub const AI_PLACEHOLDER: &str = "Summary unavailable - try again later.";

/// Identity supplied by the auth provider on sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthProfile {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

/// Object storage: bytes in, fetchable URL out.
///
/// The engine never inspects file contents beyond the MIME type string.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Binary payload for the AI service, base64-encoded with its MIME type
#[derive(Debug, Clone)]
pub struct AiPayload {
    pub base64_data: String,
    pub mime_type: String,
}

impl AiPayload {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            base64_data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }
}

/// AI text/summary collaborator
#[async_trait]
pub trait AiAssistant: Send + Sync {
    /// Markdown summary of the given context/payload
    async fn summarize(&self, context: &str, payload: Option<AiPayload>) -> Result<String>;

    async fn flashcards(&self, context: &str, payload: Option<AiPayload>) -> Result<Vec<Flashcard>>;

    async fn quiz(&self, context: &str, payload: Option<AiPayload>) -> Result<Vec<QuizQuestion>>;
}
