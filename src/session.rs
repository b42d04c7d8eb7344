//! Session lifecycle: sign-in provisioning and mirror start/stop

use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::external::AuthProfile;
use crate::model::{User, UserStatus, USER_COLLECTION};
use crate::remote::{DocumentStore, FieldOp};
use crate::store::EntityStore;
use crate::sync::SyncMirror;

/// Owns the sync mirror and gates entry with the account checks.
///
/// Sign-in provisions a user document on first contact, refuses banned
/// accounts, reactivates deactivated ones, and only then starts the mirror.
pub struct SessionManager {
    store: Arc<dyn DocumentStore>,
    mirror: SyncMirror,
    config: EngineConfig,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        entities: Arc<EntityStore>,
        config: EngineConfig,
    ) -> Self {
        let mirror = SyncMirror::new(store.clone(), entities, config.reconnect_delay);
        Self {
            store,
            mirror,
            config,
            tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Establish a session for an authenticated identity
    pub async fn sign_in(&self, profile: AuthProfile) -> Result<User> {
        if !self.config.is_domain_allowed(&profile.email) {
            return Err(EngineError::Denied(format!(
                "email domain is not allowed: {}",
                profile.email
            )));
        }

        let user = match self.store.get(USER_COLLECTION, &profile.user_id).await? {
            Some(doc) => serde_json::from_value(doc)?,
            None => {
                let user = User::new(
                    profile.user_id.clone(),
                    profile.email.clone(),
                    profile.display_name.clone(),
                    self.config.is_admin_email(&profile.email),
                );
                self.store
                    .insert(USER_COLLECTION, serde_json::to_value(&user)?)
                    .await?;
                info!(user = user.id, "provisioned new account");
                user
            }
        };

        match user.status {
            UserStatus::Banned => {
                return Err(EngineError::Denied("account is banned".into()));
            }
            UserStatus::Deactivated => {
                // Signing back in reactivates the account
                self.store
                    .apply(
                        USER_COLLECTION,
                        &user.id,
                        vec![FieldOp::Set {
                            path: "status".into(),
                            value: json!("active"),
                        }],
                    )
                    .await?;
                info!(user = user.id, "account reactivated");
            }
            UserStatus::Active => {}
        }

        let handles = self.mirror.start(&user.id);
        if let Ok(mut tasks) = self.tasks.lock() {
            *tasks = handles;
        }
        info!(user = user.id, "session started");
        Ok(user)
    }

    /// Tear down the mirror and drop every replicated slice
    pub fn sign_out(&self) {
        self.mirror.stop();
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        info!("session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;

    fn manager(config: EngineConfig) -> SessionManager {
        let store = Arc::new(MemoryStore::new(config.channel_capacity));
        let entities = Arc::new(EntityStore::new(config.channel_capacity));
        SessionManager::new(store, entities, config)
    }

    fn profile(id: &str, email: &str) -> AuthProfile {
        AuthProfile {
            user_id: id.into(),
            email: email.into(),
            display_name: "Ada".into(),
        }
    }

    #[tokio::test]
    async fn test_first_sign_in_provisions_user() {
        let mgr = manager(EngineConfig::default());
        let user = mgr.sign_in(profile("u1", "ada@campus.edu")).await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.status, UserStatus::Active);
        mgr.sign_out();
    }

    #[tokio::test]
    async fn test_disallowed_domain_rejected() {
        let config = EngineConfig {
            allowed_email_domains: vec!["campus.edu".into()],
            ..Default::default()
        };
        let mgr = manager(config);
        let err = mgr.sign_in(profile("u1", "ada@elsewhere.com")).await.unwrap_err();
        assert!(matches!(err, EngineError::Denied(_)));
    }

    #[tokio::test]
    async fn test_admin_email_gets_admin_flag() {
        let config = EngineConfig {
            admin_emails: vec!["root@campus.edu".into()],
            ..Default::default()
        };
        let mgr = manager(config);
        let user = mgr.sign_in(profile("u1", "root@campus.edu")).await.unwrap();
        assert!(user.is_admin);
        mgr.sign_out();
    }

    #[tokio::test]
    async fn test_banned_account_rejected() {
        let mgr = manager(EngineConfig::default());
        let user = mgr.sign_in(profile("u1", "ada@campus.edu")).await.unwrap();
        mgr.sign_out();

        mgr.store
            .apply(
                USER_COLLECTION,
                &user.id,
                vec![FieldOp::Set {
                    path: "status".into(),
                    value: json!("banned"),
                }],
            )
            .await
            .unwrap();
        let err = mgr.sign_in(profile("u1", "ada@campus.edu")).await.unwrap_err();
        assert!(matches!(err, EngineError::Denied(_)));
    }

    #[tokio::test]
    async fn test_deactivated_account_reactivates() {
        let mgr = manager(EngineConfig::default());
        let user = mgr.sign_in(profile("u1", "ada@campus.edu")).await.unwrap();
        mgr.sign_out();

        mgr.store
            .apply(
                USER_COLLECTION,
                &user.id,
                vec![FieldOp::Set {
                    path: "status".into(),
                    value: json!("deactivated"),
                }],
            )
            .await
            .unwrap();
        mgr.sign_in(profile("u1", "ada@campus.edu")).await.unwrap();
        let doc = mgr.store.get(USER_COLLECTION, "u1").await.unwrap().unwrap();
        assert_eq!(doc["status"], "active");
        mgr.sign_out();
    }
}
