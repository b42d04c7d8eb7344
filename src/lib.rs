//! StudyHub - state synchronization engine for a campus resource exchange
//!
//! Keeps a local mirror of a remote document store consistent while users
//! upload resources, vote, discuss, message each other, and trade requests
//! for study material.
//!
//! ## Layers
//!
//! - **Remote**: document store abstraction with atomic field operations
//! - **Sync**: per-collection subscription tasks feeding the entity store
//! - **Store**: replicated slices plus derived reads (rank, unread counts)
//! - **Gateway**: validated command execution; the only write path
//! - **Notify**: subscription-driven notification fan-out
//! - **Session**: sign-in provisioning and mirror lifecycle

pub mod config;
pub mod error;
pub mod events;
pub mod external;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod remote;
pub mod reputation;
pub mod session;
pub mod store;
pub mod sync;
pub mod thread;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use gateway::Gateway;
pub use session::SessionManager;
pub use store::EntityStore;
pub use sync::SyncMirror;
