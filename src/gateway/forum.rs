//! Forum commands: posts, replies, verified answers

use serde_json::Value;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::model::{ForumPost, ForumReply, User, FORUM_POST_COLLECTION, USER_COLLECTION};
use crate::notify::NotifyEvent;
use crate::remote::FieldOp;
use crate::reputation::{POINTS_CREATE_FORUM_POST, POINTS_VERIFIED_ANSWER};

use super::Gateway;

/// Create a discussion post; awards +10 and notifies subscribers
#[derive(Debug, Clone)]
pub struct CreateForumPost {
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub course_code: String,
}

/// Append a reply to a post; notifies the post author
#[derive(Debug, Clone)]
pub struct AddReply {
    pub post_id: String,
    pub author_id: String,
    pub text: String,
    pub parent_id: Option<String>,
}

/// Mark a reply as the verified answer.
///
/// Only the post's author may mark, never on their own reply, and at most
/// one reply per post holds the flag: the transform clears any previous
/// verified reply in the same atomic step. The reply author earns +15.
#[derive(Debug, Clone)]
pub struct MarkVerified {
    pub post_id: String,
    pub reply_id: String,
    pub caller_id: String,
}

impl Gateway {
    pub async fn create_forum_post(&self, cmd: CreateForumPost) -> Result<ForumPost> {
        self.observed("create forum post", async {
            if cmd.title.trim().is_empty() {
                return Err(EngineError::Denied("a post needs a title".into()));
            }
            let author: User = self.fetch(USER_COLLECTION, &cmd.author_id).await?;

            let post = ForumPost {
                id: crate::model::new_id(),
                author_id: author.id.clone(),
                author_name: author.display_name.clone(),
                title: cmd.title,
                body: cmd.body,
                course_code: cmd.course_code,
                created_at: chrono::Utc::now(),
                ..Default::default()
            };

            self.store()
                .insert(FORUM_POST_COLLECTION, serde_json::to_value(&post)?)
                .await?;
            self.ledger()
                .award_points(&author.id, POINTS_CREATE_FORUM_POST, "discussion post")
                .await?;
            self.notifications()
                .dispatch(NotifyEvent::NewForumPost {
                    actor_id: author.id.clone(),
                    actor_name: author.display_name.clone(),
                    post_id: post.id.clone(),
                    title: post.title.clone(),
                    course_code: post.course_code.clone(),
                })
                .await?;

            info!(post = post.id, author = post.author_id, "forum post created");
            Ok(post)
        })
        .await
    }

    pub async fn add_reply(&self, cmd: AddReply) -> Result<ForumReply> {
        self.observed("add reply", async {
            if cmd.text.trim().is_empty() {
                return Err(EngineError::Denied("a reply needs text".into()));
            }
            let author: User = self.fetch(USER_COLLECTION, &cmd.author_id).await?;
            let post: ForumPost = self.fetch(FORUM_POST_COLLECTION, &cmd.post_id).await?;

            let reply = ForumReply::new(
                author.id.clone(),
                author.display_name.clone(),
                cmd.text,
                cmd.parent_id,
            );
            self.store()
                .apply(
                    FORUM_POST_COLLECTION,
                    &post.id,
                    vec![FieldOp::Push {
                        path: "replies".into(),
                        value: serde_json::to_value(&reply)?,
                    }],
                )
                .await?;

            if post.author_id != author.id {
                self.notifications()
                    .dispatch(NotifyEvent::NewReply {
                        actor_name: author.display_name.clone(),
                        post_id: post.id.clone(),
                        reply_id: reply.id.clone(),
                        recipient_id: post.author_id.clone(),
                    })
                    .await?;
            }
            Ok(reply)
        })
        .await
    }

    pub async fn mark_verified(&self, cmd: MarkVerified) -> Result<()> {
        self.observed("mark verified", async {
            let caller = cmd.caller_id.clone();
            let reply_id = cmd.reply_id.clone();

            let updated = self
                .store()
                .transform(
                    FORUM_POST_COLLECTION,
                    &cmd.post_id,
                    Box::new(move |doc| {
                        if doc.get("authorId").and_then(Value::as_str) != Some(caller.as_str()) {
                            return Err(EngineError::Denied(
                                "only the post author may verify an answer".into(),
                            ));
                        }
                        let replies = doc
                            .get("replies")
                            .and_then(Value::as_array)
                            .ok_or_else(|| EngineError::NotFound(format!("replies/{reply_id}")))?;

                        let target = replies
                            .iter()
                            .find(|r| r.get("id").and_then(Value::as_str) == Some(reply_id.as_str()))
                            .ok_or_else(|| EngineError::NotFound(format!("replies/{reply_id}")))?;
                        if target.get("authorId").and_then(Value::as_str) == Some(caller.as_str()) {
                            return Err(EngineError::Denied(
                                "cannot verify your own reply".into(),
                            ));
                        }
                        if target.get("isVerified").and_then(Value::as_bool) == Some(true) {
                            return Err(EngineError::Conflict("reply already verified".into()));
                        }

                        // At most one verified reply: flip the target, clear
                        // the rest, all in this one transform
                        let updated: Vec<Value> = replies
                            .iter()
                            .map(|r| {
                                let mut r = r.clone();
                                let is_target =
                                    r.get("id").and_then(Value::as_str) == Some(reply_id.as_str());
                                r["isVerified"] = Value::Bool(is_target);
                                r
                            })
                            .collect();
                        Ok(vec![FieldOp::Set {
                            path: "replies".into(),
                            value: Value::Array(updated),
                        }])
                    }),
                )
                .await?;

            // Award the reply author from the committed document
            let post: ForumPost = serde_json::from_value(updated)?;
            if let Some(reply) = post.reply(&cmd.reply_id) {
                self.ledger()
                    .award_points(&reply.author_id, POINTS_VERIFIED_ANSWER, "verified answer")
                    .await?;
            }
            info!(post = cmd.post_id, reply = cmd.reply_id, "reply verified");
            Ok(())
        })
        .await
    }
}
