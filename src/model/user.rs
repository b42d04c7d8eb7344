//! User document schema
//!
//! Identity, reputation counters, subscriptions and moderation state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Role a user holds on the platform
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Admin,
    Lecturer,
}

/// Account status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Banned,
    Deactivated,
}

/// Things a user follows; new matching content routes a notification
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriptions {
    /// IDs of followed users
    #[serde(default)]
    pub users: BTreeSet<String>,
    /// Followed lecturer names
    #[serde(default)]
    pub lecturers: BTreeSet<String>,
    /// Followed course codes
    #[serde(default)]
    pub courses: BTreeSet<String>,
}

/// User document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,

    /// Lifetime reputation
    #[serde(default)]
    pub points: i64,
    /// Reputation earned this week (reset externally)
    #[serde(default)]
    pub weekly_points: i64,
    /// Number of resources this user has uploaded
    #[serde(default)]
    pub upload_count: i64,

    #[serde(default)]
    pub subscriptions: Subscriptions,
    #[serde(default)]
    pub saved_resource_ids: BTreeSet<String>,

    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,

    /// True for the fixed admin-email allow-list at creation; afterwards
    /// mutable only by an existing admin, never by the subject user.
    #[serde(default)]
    pub is_admin: bool,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user document from an auth profile
    pub fn new(id: String, email: String, display_name: String, is_admin: bool) -> Self {
        Self {
            id,
            email,
            display_name,
            role: if is_admin { UserRole::Admin } else { UserRole::Student },
            is_admin,
            created_at: Utc::now(),
            ..Default::default()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_layout() {
        let user = User::new("u1".into(), "a@b.edu".into(), "Ada".into(), false);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("displayName").is_some());
        assert!(json.get("weeklyPoints").is_some());
        assert!(json.get("savedResourceIds").is_some());
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_admin_flag_from_allow_list() {
        let user = User::new("u1".into(), "ops@b.edu".into(), "Ops".into(), true);
        assert!(user.is_admin);
        assert_eq!(user.role, UserRole::Admin);
    }
}
