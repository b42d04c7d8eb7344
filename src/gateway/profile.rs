//! Profile commands: subscriptions, saved resources, profile edits

use serde_json::json;

use crate::error::{EngineError, Result};
use crate::model::USER_COLLECTION;
use crate::remote::FieldOp;

use super::Gateway;

/// What a user can follow for notification fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionTarget {
    User(String),
    Lecturer(String),
    Course(String),
}

impl SubscriptionTarget {
    /// Dotted path of the subscription set this target lives in
    fn path(&self) -> &'static str {
        match self {
            SubscriptionTarget::User(_) => "subscriptions.users",
            SubscriptionTarget::Lecturer(_) => "subscriptions.lecturers",
            SubscriptionTarget::Course(_) => "subscriptions.courses",
        }
    }

    fn key(&self) -> &str {
        match self {
            SubscriptionTarget::User(k)
            | SubscriptionTarget::Lecturer(k)
            | SubscriptionTarget::Course(k) => k,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscribe {
    pub user_id: String,
    pub target: SubscriptionTarget,
}

#[derive(Debug, Clone)]
pub struct Unsubscribe {
    pub user_id: String,
    pub target: SubscriptionTarget,
}

#[derive(Debug, Clone)]
pub struct SaveResource {
    pub user_id: String,
    pub resource_id: String,
}

#[derive(Debug, Clone)]
pub struct UnsaveResource {
    pub user_id: String,
    pub resource_id: String,
}

/// Last write wins; concurrent edits are not merged
#[derive(Debug, Clone)]
pub struct UpdateProfile {
    pub user_id: String,
    pub display_name: String,
}

impl Gateway {
    pub async fn subscribe(&self, cmd: Subscribe) -> Result<()> {
        self.observed("subscribe", async {
            if matches!(&cmd.target, SubscriptionTarget::User(id) if id == &cmd.user_id) {
                return Err(EngineError::Denied("cannot follow yourself".into()));
            }
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.user_id,
                    vec![FieldOp::AddToSet {
                        path: cmd.target.path().into(),
                        value: json!(cmd.target.key()),
                    }],
                )
                .await
        })
        .await
    }

    pub async fn unsubscribe(&self, cmd: Unsubscribe) -> Result<()> {
        self.observed("unsubscribe", async {
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.user_id,
                    vec![FieldOp::Pull {
                        path: cmd.target.path().into(),
                        value: json!(cmd.target.key()),
                    }],
                )
                .await
        })
        .await
    }

    pub async fn save_resource(&self, cmd: SaveResource) -> Result<()> {
        self.observed("save resource", async {
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.user_id,
                    vec![FieldOp::AddToSet {
                        path: "savedResourceIds".into(),
                        value: json!(cmd.resource_id),
                    }],
                )
                .await
        })
        .await
    }

    pub async fn unsave_resource(&self, cmd: UnsaveResource) -> Result<()> {
        self.observed("unsave resource", async {
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.user_id,
                    vec![FieldOp::Pull {
                        path: "savedResourceIds".into(),
                        value: json!(cmd.resource_id),
                    }],
                )
                .await
        })
        .await
    }

    pub async fn update_profile(&self, cmd: UpdateProfile) -> Result<()> {
        self.observed("update profile", async {
            if cmd.display_name.trim().is_empty() {
                return Err(EngineError::Denied("display name cannot be empty".into()));
            }
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.user_id,
                    vec![FieldOp::Set {
                        path: "displayName".into(),
                        value: json!(cmd.display_name),
                    }],
                )
                .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_paths() {
        assert_eq!(SubscriptionTarget::User("u2".into()).path(), "subscriptions.users");
        assert_eq!(
            SubscriptionTarget::Lecturer("Dr. Liskov".into()).path(),
            "subscriptions.lecturers"
        );
        assert_eq!(SubscriptionTarget::Course("CS4006".into()).path(), "subscriptions.courses");
    }
}
