//! Vote toggle command
//!
//! A voter's membership in `upvotedBy` and `downvotedBy` is mutually
//! exclusive. Same direction again removes the vote; the opposite direction
//! swaps both memberships and both counters in the same atomic transform.
//! The whole toggle is keyed by the membership the store sees at apply time,
//! so two concurrent voters never lose an increment.

use serde_json::{json, Value};

use crate::error::{EngineError, Result};
use crate::model::{FORUM_POST_COLLECTION, RESOURCE_COLLECTION};
use crate::remote::{FieldOp, JsonDoc};

use super::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

/// What is being voted on
#[derive(Debug, Clone)]
pub enum VoteTarget {
    Resource(String),
    ForumPost(String),
    /// A comment embedded in a resource document (up-only)
    Comment { resource_id: String, comment_id: String },
    /// A reply embedded in a forum post document (up-only)
    Reply { post_id: String, reply_id: String },
}

/// Toggle a vote
#[derive(Debug, Clone)]
pub struct Vote {
    pub target: VoteTarget,
    pub direction: VoteDirection,
    pub voter_id: String,
}

impl Gateway {
    pub async fn vote(&self, cmd: Vote) -> Result<()> {
        self.observed("vote", async {
            let voter = cmd.voter_id.clone();
            match cmd.target {
                VoteTarget::Resource(id) => {
                    let direction = cmd.direction;
                    self.store()
                        .transform(
                            RESOURCE_COLLECTION,
                            &id,
                            Box::new(move |doc| toggle_ops(doc, &voter, direction)),
                        )
                        .await?;
                }
                VoteTarget::ForumPost(id) => {
                    let direction = cmd.direction;
                    self.store()
                        .transform(
                            FORUM_POST_COLLECTION,
                            &id,
                            Box::new(move |doc| toggle_ops(doc, &voter, direction)),
                        )
                        .await?;
                }
                VoteTarget::Comment { resource_id, comment_id } => {
                    if cmd.direction == VoteDirection::Down {
                        return Err(EngineError::Denied("comments only support upvotes".into()));
                    }
                    self.store()
                        .transform(
                            RESOURCE_COLLECTION,
                            &resource_id,
                            Box::new(move |doc| embedded_toggle_ops(doc, "comments", &comment_id, &voter)),
                        )
                        .await?;
                }
                VoteTarget::Reply { post_id, reply_id } => {
                    if cmd.direction == VoteDirection::Down {
                        return Err(EngineError::Denied("replies only support upvotes".into()));
                    }
                    self.store()
                        .transform(
                            FORUM_POST_COLLECTION,
                            &post_id,
                            Box::new(move |doc| embedded_toggle_ops(doc, "replies", &reply_id, &voter)),
                        )
                        .await?;
                }
            }
            Ok(())
        })
        .await
    }
}

fn member(doc: &JsonDoc, field: &str, voter: &str) -> bool {
    doc.get(field)
        .and_then(Value::as_array)
        .is_some_and(|arr| arr.contains(&json!(voter)))
}

/// Build the toggle ops for a top-level votable document.
///
/// Runs inside the store transaction against the committed document.
fn toggle_ops(doc: &JsonDoc, voter: &str, direction: VoteDirection) -> Result<Vec<FieldOp>> {
    if doc.get("authorId").and_then(Value::as_str) == Some(voter) {
        return Err(EngineError::Denied("cannot vote on your own content".into()));
    }

    let (own_set, own_count, other_set, other_count) = match direction {
        VoteDirection::Up => ("upvotedBy", "upvotes", "downvotedBy", "downvotes"),
        VoteDirection::Down => ("downvotedBy", "downvotes", "upvotedBy", "upvotes"),
    };

    let mut ops = Vec::new();
    if member(doc, own_set, voter) {
        // Same direction again: remove the vote, leave the other side alone
        ops.push(FieldOp::Pull { path: own_set.into(), value: json!(voter) });
        ops.push(FieldOp::Increment { path: own_count.into(), by: -1 });
    } else {
        ops.push(FieldOp::AddToSet { path: own_set.into(), value: json!(voter) });
        ops.push(FieldOp::Increment { path: own_count.into(), by: 1 });
        if member(doc, other_set, voter) {
            // Swap: both sides move in the same atomic operation
            ops.push(FieldOp::Pull { path: other_set.into(), value: json!(voter) });
            ops.push(FieldOp::Increment { path: other_count.into(), by: -1 });
        }
    }
    Ok(ops)
}

/// Up-only toggle for a node embedded in a parent document's array
/// (`comments` / `replies`). Rewrites the array in the same transaction.
fn embedded_toggle_ops(doc: &JsonDoc, field: &str, node_id: &str, voter: &str) -> Result<Vec<FieldOp>> {
    let arr = doc
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::NotFound(format!("{field}/{node_id}")))?;

    let mut updated = arr.clone();
    let node = updated
        .iter_mut()
        .find(|n| n.get("id").and_then(Value::as_str) == Some(node_id))
        .ok_or_else(|| EngineError::NotFound(format!("{field}/{node_id}")))?;

    if node.get("authorId").and_then(Value::as_str) == Some(voter) {
        return Err(EngineError::Denied("cannot vote on your own content".into()));
    }

    let upvoted = node
        .get("upvotedBy")
        .and_then(Value::as_array)
        .is_some_and(|a| a.contains(&json!(voter)));
    let count = node.get("upvotes").and_then(Value::as_i64).unwrap_or(0);

    if upvoted {
        if let Some(a) = node.get_mut("upvotedBy").and_then(Value::as_array_mut) {
            a.retain(|v| v != &json!(voter));
        }
        node["upvotes"] = json!(count - 1);
    } else {
        match node.get_mut("upvotedBy").and_then(Value::as_array_mut) {
            Some(a) => a.push(json!(voter)),
            None => node["upvotedBy"] = json!([voter]),
        }
        node["upvotes"] = json!(count + 1);
    }

    Ok(vec![FieldOp::Set { path: field.into(), value: Value::Array(updated) }])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource_doc() -> JsonDoc {
        json!({
            "id": "r1",
            "authorId": "author",
            "upvotes": 0,
            "downvotes": 0,
            "upvotedBy": [],
            "downvotedBy": []
        })
    }

    fn apply_all(doc: &mut JsonDoc, ops: Vec<FieldOp>) {
        for op in ops {
            crate::remote::apply_field_op(doc, &op).unwrap();
        }
    }

    #[test]
    fn test_vote_then_same_vote_is_identity() {
        let mut doc = resource_doc();
        let before = doc.clone();

        let ops = toggle_ops(&doc, "u1", VoteDirection::Up).unwrap();
        apply_all(&mut doc, ops);
        assert_eq!(doc["upvotes"], 1);
        assert_eq!(doc["upvotedBy"], json!(["u1"]));

        let ops = toggle_ops(&doc, "u1", VoteDirection::Up).unwrap();
        apply_all(&mut doc, ops);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_opposite_vote_swaps_atomically() {
        let mut doc = resource_doc();
        let ops = toggle_ops(&doc, "u1", VoteDirection::Up).unwrap();
        apply_all(&mut doc, ops);
        let ops = toggle_ops(&doc, "u1", VoteDirection::Down).unwrap();
        apply_all(&mut doc, ops);

        assert_eq!(doc["upvotes"], 0);
        assert_eq!(doc["downvotes"], 1);
        assert_eq!(doc["upvotedBy"], json!([]));
        assert_eq!(doc["downvotedBy"], json!(["u1"]));
    }

    #[test]
    fn test_never_in_both_sets() {
        let mut doc = resource_doc();
        for direction in [
            VoteDirection::Up,
            VoteDirection::Down,
            VoteDirection::Down,
            VoteDirection::Up,
            VoteDirection::Down,
        ] {
            let ops = toggle_ops(&doc, "u1", direction).unwrap();
            apply_all(&mut doc, ops);
            let in_up = member(&doc, "upvotedBy", "u1");
            let in_down = member(&doc, "downvotedBy", "u1");
            assert!(!(in_up && in_down), "voter in both sets");
        }
    }

    #[test]
    fn test_self_vote_rejected() {
        let doc = resource_doc();
        let err = toggle_ops(&doc, "author", VoteDirection::Up).unwrap_err();
        assert!(matches!(err, EngineError::Denied(_)));
    }

    #[test]
    fn test_embedded_comment_toggle() {
        let doc = json!({
            "id": "r1",
            "authorId": "author",
            "comments": [{
                "id": "c1",
                "authorId": "u2",
                "upvotes": 0,
                "upvotedBy": []
            }]
        });

        let ops = embedded_toggle_ops(&doc, "comments", "c1", "u1").unwrap();
        let mut updated = doc.clone();
        for op in &ops {
            crate::remote::apply_field_op(&mut updated, op).unwrap();
        }
        assert_eq!(updated["comments"][0]["upvotes"], 1);

        let ops = embedded_toggle_ops(&updated, "comments", "c1", "u1").unwrap();
        for op in &ops {
            crate::remote::apply_field_op(&mut updated, op).unwrap();
        }
        assert_eq!(updated["comments"][0]["upvotes"], 0);
        assert_eq!(updated["comments"][0]["upvotedBy"], json!([]));

        // Comment author cannot vote on their own comment
        let err = embedded_toggle_ops(&doc, "comments", "c1", "u2").unwrap_err();
        assert!(matches!(err, EngineError::Denied(_)));

        // Missing node is NotFound
        let err = embedded_toggle_ops(&doc, "comments", "zz", "u1").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
