//! Resource document schema
//!
//! Authored study material with vote state, a denormalized comment list and
//! optional AI-derived fields populated asynchronously after creation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for resources
pub const RESOURCE_COLLECTION: &str = "resources";

/// A comment on a resource.
///
/// `parent_id` is either `None` (root) or the ID of another comment in the
/// same resource document; children of deleted parents stay addressable.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub upvoted_by: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: String, author_name: String, text: String, parent_id: Option<String>) -> Self {
        Self {
            id: super::new_id(),
            author_id,
            author_name,
            text,
            parent_id,
            upvotes: 0,
            upvoted_by: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// AI-derived flashcard
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

/// AI-derived quiz question
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Resource document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub lecturer_name: String,
    /// URL handed back by the object-storage collaborator
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub mime_type: String,

    // Vote state. A user is never in both sets at once.
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub upvoted_by: BTreeSet<String>,
    #[serde(default)]
    pub downvoted_by: BTreeSet<String>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    // Populated asynchronously after creation; a failed AI call degrades to
    // a placeholder string rather than an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_flashcards: Option<Vec<Flashcard>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_quiz_questions: Option<Vec<QuizQuestion>>,

    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// Net score used for ranking resource lists
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }
}
