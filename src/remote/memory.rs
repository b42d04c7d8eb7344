//! In-process document store backend
//!
//! Plays the remote store's role for tests and embedded deployments: keyed
//! JSON documents per collection, atomic field operations under a
//! per-collection lock, and full-snapshot change batches fanned out over
//! broadcast channels. Insertion order is preserved, which is the storage
//! order the entity store mirrors.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{EngineError, Result};

use super::{
    apply_field_op, doc_id, ChangeBatch, DocumentStore, FieldOp, Filter, JsonDoc, TransformFn,
};

struct Watcher {
    filter: Filter,
    tx: broadcast::Sender<ChangeBatch>,
}

#[derive(Default)]
struct CollectionState {
    docs: Vec<JsonDoc>,
    revision: u64,
    watchers: Vec<Watcher>,
}

impl CollectionState {
    fn position(&self, id: &str) -> Option<usize> {
        self.docs
            .iter()
            .position(|d| d.get("id").and_then(Value::as_str) == Some(id))
    }

    /// Bump the commit counter and send every live watcher a fresh snapshot
    /// of its slice. Watchers with no remaining receivers are dropped.
    fn commit(&mut self, collection: &str) {
        self.revision += 1;
        let revision = self.revision;
        let docs = &self.docs;
        self.watchers.retain(|w| {
            if w.tx.receiver_count() == 0 {
                return false;
            }
            let batch = ChangeBatch {
                collection: collection.to_string(),
                revision,
                docs: docs.iter().filter(|d| w.filter.matches(d)).cloned().collect(),
            };
            let _ = w.tx.send(batch);
            true
        });
    }
}

/// In-memory [`DocumentStore`] backend
pub struct MemoryStore {
    collections: DashMap<String, CollectionState>,
    channel_capacity: usize,
}

impl MemoryStore {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            collections: DashMap::new(),
            channel_capacity,
        }
    }

    /// Number of documents currently held in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<JsonDoc>> {
        Ok(self.collections.get(collection).and_then(|state| {
            state.position(id).map(|i| state.docs[i].clone())
        }))
    }

    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<JsonDoc>> {
        Ok(self
            .collections
            .get(collection)
            .map(|state| {
                state
                    .docs
                    .iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, doc: JsonDoc) -> Result<()> {
        let id = doc_id(&doc)?.to_string();
        let mut state = self.collections.entry(collection.to_string()).or_default();
        if state.position(&id).is_some() {
            return Err(EngineError::Conflict(format!(
                "{collection}/{id} already exists"
            )));
        }
        state.docs.push(doc);
        state.commit(collection);
        debug!(collection, id, "document inserted");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut state = self.collections.entry(collection.to_string()).or_default();
        let Some(pos) = state.position(id) else {
            return Err(EngineError::NotFound(format!("{collection}/{id}")));
        };
        state.docs.remove(pos);
        state.commit(collection);
        debug!(collection, id, "document deleted");
        Ok(())
    }

    async fn apply(&self, collection: &str, id: &str, ops: Vec<FieldOp>) -> Result<()> {
        let mut state = self.collections.entry(collection.to_string()).or_default();
        let Some(pos) = state.position(id) else {
            return Err(EngineError::NotFound(format!("{collection}/{id}")));
        };
        // Stage on a copy so a bad op leaves the document untouched
        let mut doc = state.docs[pos].clone();
        for op in &ops {
            apply_field_op(&mut doc, op)?;
        }
        state.docs[pos] = doc;
        state.commit(collection);
        Ok(())
    }

    async fn transform(&self, collection: &str, id: &str, f: TransformFn) -> Result<JsonDoc> {
        let mut state = self.collections.entry(collection.to_string()).or_default();
        let Some(pos) = state.position(id) else {
            return Err(EngineError::NotFound(format!("{collection}/{id}")));
        };
        // The collection lock is held across the closure, so the closure
        // always sees the committed state and no interleaving write is
        // possible: this is the transaction the toggle semantics rely on.
        let ops = f(&state.docs[pos])?;
        if ops.is_empty() {
            return Ok(state.docs[pos].clone());
        }
        let mut doc = state.docs[pos].clone();
        for op in &ops {
            apply_field_op(&mut doc, op)?;
        }
        state.docs[pos] = doc.clone();
        state.commit(collection);
        Ok(doc)
    }

    async fn update_where(&self, collection: &str, filter: &Filter, ops: Vec<FieldOp>) -> Result<u64> {
        let mut state = self.collections.entry(collection.to_string()).or_default();
        let mut count = 0u64;
        for i in 0..state.docs.len() {
            if !filter.matches(&state.docs[i]) {
                continue;
            }
            let mut doc = state.docs[i].clone();
            for op in &ops {
                apply_field_op(&mut doc, op)?;
            }
            state.docs[i] = doc;
            count += 1;
        }
        if count > 0 {
            state.commit(collection);
        }
        Ok(count)
    }

    async fn delete_where(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut state = self.collections.entry(collection.to_string()).or_default();
        let before = state.docs.len();
        state.docs.retain(|d| !filter.matches(d));
        let count = (before - state.docs.len()) as u64;
        if count > 0 {
            state.commit(collection);
        }
        Ok(count)
    }

    async fn watch(&self, collection: &str, filter: Filter) -> Result<broadcast::Receiver<ChangeBatch>> {
        let mut state = self.collections.entry(collection.to_string()).or_default();
        let (tx, rx) = broadcast::channel(self.channel_capacity);

        // Initial snapshot before any further commit can interleave; the
        // receiver already exists so the send cannot be lost.
        let initial = ChangeBatch {
            collection: collection.to_string(),
            revision: state.revision,
            docs: state
                .docs
                .iter()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect(),
        };
        let _ = tx.send(initial);

        state.watchers.push(Watcher { filter, tx });
        debug!(collection, "watch registered");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = MemoryStore::default();
        store
            .insert("resources", json!({ "id": "r1", "title": "notes" }))
            .await
            .unwrap();
        assert!(store.get("resources", "r1").await.unwrap().is_some());

        // Duplicate insert is a conflict
        let err = store
            .insert("resources", json!({ "id": "r1" }))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        store.delete("resources", "r1").await.unwrap();
        assert!(store.get("resources", "r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_is_all_or_nothing() {
        let store = MemoryStore::default();
        store
            .insert("resources", json!({ "id": "r1", "upvotes": 1 }))
            .await
            .unwrap();

        // Second op targets a non-object path; the first must not stick
        let err = store
            .apply(
                "resources",
                "r1",
                vec![
                    FieldOp::Increment { path: "upvotes".into(), by: 1 },
                    FieldOp::Set { path: "upvotes.bad.path".into(), value: json!(1) },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));

        let doc = store.get("resources", "r1").await.unwrap().unwrap();
        assert_eq!(doc["upvotes"], 1);
    }

    #[tokio::test]
    async fn test_transform_guard_leaves_doc_unchanged() {
        let store = MemoryStore::default();
        store
            .insert("resourceRequests", json!({ "id": "q1", "status": "fulfilled" }))
            .await
            .unwrap();

        let err = store
            .transform(
                "resourceRequests",
                "q1",
                Box::new(|doc| {
                    if doc["status"] == "fulfilled" {
                        return Err(EngineError::Conflict("request already fulfilled".into()));
                    }
                    Ok(vec![FieldOp::Set { path: "status".into(), value: json!("fulfilled") }])
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_watch_delivers_initial_and_updates() {
        let store = MemoryStore::default();
        store
            .insert("notifications", json!({ "id": "n1", "recipientId": "u1" }))
            .await
            .unwrap();

        let mut rx = store
            .watch(
                "notifications",
                Filter::FieldEq("recipientId".into(), json!("u1")),
            )
            .await
            .unwrap();

        let initial = rx.recv().await.unwrap();
        assert_eq!(initial.docs.len(), 1);

        // A doc for another recipient still produces a batch, but the slice
        // stays filtered
        store
            .insert("notifications", json!({ "id": "n2", "recipientId": "u2" }))
            .await
            .unwrap();
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.docs.len(), 1);
        assert!(batch.revision > initial.revision);

        store
            .insert("notifications", json!({ "id": "n3", "recipientId": "u1" }))
            .await
            .unwrap();
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.docs.len(), 2);
    }

    #[tokio::test]
    async fn test_update_where_scoped_by_predicate() {
        let store = MemoryStore::default();
        for (id, recipient) in [("n1", "u1"), ("n2", "u2"), ("n3", "u1")] {
            store
                .insert(
                    "notifications",
                    json!({ "id": id, "recipientId": recipient, "isRead": false }),
                )
                .await
                .unwrap();
        }

        let count = store
            .update_where(
                "notifications",
                &Filter::FieldEq("recipientId".into(), json!("u1")),
                vec![FieldOp::Set { path: "isRead".into(), value: json!(true) }],
            )
            .await
            .unwrap();
        assert_eq!(count, 2);

        let untouched = store.get("notifications", "n2").await.unwrap().unwrap();
        assert_eq!(untouched["isRead"], false);
    }

    #[tokio::test]
    async fn test_concurrent_transforms_lose_no_increment() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::default());
        store
            .insert("resources", json!({ "id": "r1", "upvotes": 0, "upvotedBy": [] }))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let voter = format!("u{i}");
                store
                    .transform(
                        "resources",
                        "r1",
                        Box::new(move |doc| {
                            let already = doc["upvotedBy"]
                                .as_array()
                                .is_some_and(|a| a.contains(&json!(voter)));
                            assert!(!already);
                            Ok(vec![
                                FieldOp::Increment { path: "upvotes".into(), by: 1 },
                                FieldOp::AddToSet { path: "upvotedBy".into(), value: json!(voter) },
                            ])
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let doc = store.get("resources", "r1").await.unwrap().unwrap();
        assert_eq!(doc["upvotes"], 50);
        assert_eq!(doc["upvotedBy"].as_array().unwrap().len(), 50);
    }
}
