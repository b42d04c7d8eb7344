//! Remote document store boundary
//!
//! The remote store owns every entity and is the sole ordering authority.
//! Documents cross this boundary as opaque JSON keyed by `id`; typed models
//! live above it. Counters and set memberships are only ever changed through
//! the atomic [`FieldOp`] primitives or a [`DocumentStore::transform`], never
//! by writing back a locally mutated snapshot.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{EngineError, Result};

/// A document as stored remotely
pub type JsonDoc = Value;

/// Atomic field operations, applied by the store under its own ordering.
///
/// `path` is dot-separated ("subscriptions.users"). Increment treats a
/// missing field as 0; AddToSet and Pull treat a missing field as an empty
/// array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldOp {
    /// Plain overwrite; accepted last-write-wins
    Set { path: String, value: Value },
    /// Atomic counter increment (negative to decrement)
    Increment { path: String, by: i64 },
    /// Set-union: append the value unless already present
    AddToSet { path: String, value: Value },
    /// Set-difference: remove every element equal to the value
    Pull { path: String, value: Value },
    /// Array append (duplicates allowed)
    Push { path: String, value: Value },
}

/// Stable subscription / query predicate
#[derive(Debug, Clone)]
pub enum Filter {
    All,
    /// Field at path equals the value
    FieldEq(String, Value),
    /// Array at path contains the value
    Contains(String, Value),
}

impl Filter {
    pub fn matches(&self, doc: &JsonDoc) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldEq(path, value) => field_at(doc, path) == Some(value),
            Filter::Contains(path, value) => field_at(doc, path)
                .and_then(Value::as_array)
                .is_some_and(|arr| arr.contains(value)),
        }
    }
}

/// One delivery from a live subscription: the full authoritative snapshot of
/// the watched slice, in the store's commit order.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub collection: String,
    /// Per-collection commit counter; strictly increasing within one
    /// subscription
    pub revision: u64,
    pub docs: Vec<JsonDoc>,
}

/// Atomic read-modify-write body, executed under the store's transaction.
///
/// Receives the current document and returns the field operations to apply,
/// or a typed rejection (guard failure). Runs exactly once.
pub type TransformFn = Box<dyn FnOnce(&JsonDoc) -> Result<Vec<FieldOp>> + Send>;

/// Contract with the remote document store.
///
/// Mutations either complete or fail; none are cancellable in flight.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<JsonDoc>>;

    async fn list(&self, collection: &str, filter: &Filter) -> Result<Vec<JsonDoc>>;

    /// Insert a document carrying its `id`; rejects duplicates
    async fn insert(&self, collection: &str, doc: JsonDoc) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Apply unconditional atomic field operations to one document
    async fn apply(&self, collection: &str, id: &str, ops: Vec<FieldOp>) -> Result<()>;

    /// Atomic read-modify-write on one document. Concurrent transforms of the
    /// same document serialize at the store; the closure always sees the
    /// current committed state.
    async fn transform(&self, collection: &str, id: &str, f: TransformFn) -> Result<JsonDoc>;

    /// Apply ops to every document matching the filter; returns the count.
    /// Scoping is the predicate itself - there is no separate authorization
    /// pass.
    async fn update_where(&self, collection: &str, filter: &Filter, ops: Vec<FieldOp>) -> Result<u64>;

    /// Delete every document matching the filter; returns the count
    async fn delete_where(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Live subscription. The first batch is the current snapshot; every
    /// commit touching the collection produces a fresh full snapshot of the
    /// matching slice.
    async fn watch(&self, collection: &str, filter: Filter) -> Result<broadcast::Receiver<ChangeBatch>>;
}

/// Resolve a dot-separated path inside a document
pub(crate) fn field_at<'a>(doc: &'a JsonDoc, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Resolve a dot-separated path, creating intermediate objects
fn field_at_mut<'a>(doc: &'a mut JsonDoc, path: &str) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path.split('.') {
        let obj = current.as_object_mut()?;
        current = obj.entry(segment.to_string()).or_insert(Value::Null);
    }
    Some(current)
}

/// Apply a single field operation to a document in place
pub(crate) fn apply_field_op(doc: &mut JsonDoc, op: &FieldOp) -> Result<()> {
    match op {
        FieldOp::Set { path, value } => {
            let slot = field_at_mut(doc, path)
                .ok_or_else(|| EngineError::Remote(format!("bad path: {path}")))?;
            *slot = value.clone();
        }
        FieldOp::Increment { path, by } => {
            let slot = field_at_mut(doc, path)
                .ok_or_else(|| EngineError::Remote(format!("bad path: {path}")))?;
            let current = slot.as_i64().unwrap_or(0);
            *slot = Value::from(current + by);
        }
        FieldOp::AddToSet { path, value } => {
            let slot = field_at_mut(doc, path)
                .ok_or_else(|| EngineError::Remote(format!("bad path: {path}")))?;
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(arr) = slot {
                if !arr.contains(value) {
                    arr.push(value.clone());
                }
            }
        }
        FieldOp::Pull { path, value } => {
            let slot = field_at_mut(doc, path)
                .ok_or_else(|| EngineError::Remote(format!("bad path: {path}")))?;
            if let Some(arr) = slot.as_array_mut() {
                arr.retain(|v| v != value);
            }
        }
        FieldOp::Push { path, value } => {
            let slot = field_at_mut(doc, path)
                .ok_or_else(|| EngineError::Remote(format!("bad path: {path}")))?;
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(arr) = slot {
                arr.push(value.clone());
            }
        }
    }
    Ok(())
}

/// Extract the `id` field of a document
pub(crate) fn doc_id(doc: &JsonDoc) -> Result<&str> {
    doc.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Serialization("document is missing an id".into()))
}
