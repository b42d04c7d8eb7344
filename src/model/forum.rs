//! Forum post document schema
//!
//! Discussion posts with embedded reply threads and verified-answer state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for forum posts
pub const FORUM_POST_COLLECTION: &str = "forumPosts";

/// A reply inside a forum post.
///
/// Same shape as a resource comment plus the verified-answer flag, which only
/// the post's author may set and only on a reply authored by someone else.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForumReply {
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
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl ForumReply {
    pub fn new(author_id: String, author_name: String, text: String, parent_id: Option<String>) -> Self {
        Self {
            id: super::new_id(),
            author_id,
            author_name,
            text,
            parent_id,
            upvotes: 0,
            upvoted_by: BTreeSet::new(),
            is_verified: false,
            created_at: Utc::now(),
        }
    }
}

/// Forum post document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub course_code: String,

    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub upvoted_by: BTreeSet<String>,
    #[serde(default)]
    pub downvoted_by: BTreeSet<String>,

    #[serde(default)]
    pub replies: Vec<ForumReply>,

    pub created_at: DateTime<Utc>,
}

impl ForumPost {
    pub fn reply(&self, reply_id: &str) -> Option<&ForumReply> {
        self.replies.iter().find(|r| r.id == reply_id)
    }

    /// The currently verified reply, if any. At most one exists.
    pub fn verified_reply(&self) -> Option<&ForumReply> {
        self.replies.iter().find(|r| r.is_verified)
    }
}
