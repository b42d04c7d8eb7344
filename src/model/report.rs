//! Report document schema
//!
//! Moderation reports: `pending -> resolved | dismissed`, terminal after
//! leaving `pending`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for reports
pub const REPORT_COLLECTION: &str = "reports";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

/// Report document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    /// Collection of the reported entity (e.g. "resources", "forumPosts")
    pub target_collection: String,
    pub target_id: String,
    pub reason: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(reporter_id: String, target_collection: String, target_id: String, reason: String) -> Self {
        Self {
            id: super::new_id(),
            reporter_id,
            target_collection,
            target_id,
            reason,
            status: ReportStatus::Pending,
            resolved_by: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminality() {
        assert!(!ReportStatus::Pending.is_terminal());
        assert!(ReportStatus::Resolved.is_terminal());
        assert!(ReportStatus::Dismissed.is_terminal());
    }
}
