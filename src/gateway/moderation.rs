//! Moderation commands: account status, admin grants, content reports

use serde_json::{json, Value};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::model::{Report, UserStatus, REPORT_COLLECTION, USER_COLLECTION};
use crate::remote::FieldOp;

use super::Gateway;

/// Ban, deactivate, or reinstate an account; admin only
#[derive(Debug, Clone)]
pub struct SetUserStatus {
    pub caller_id: String,
    pub target_id: String,
    pub status: UserStatus,
}

/// Grant or revoke the admin flag; admin only, never on yourself
#[derive(Debug, Clone)]
pub struct SetAdmin {
    pub caller_id: String,
    pub target_id: String,
    pub is_admin: bool,
}

/// Flag a document for moderator review
#[derive(Debug, Clone)]
pub struct FileReport {
    pub reporter_id: String,
    pub target_collection: String,
    pub target_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportResolution {
    Resolved,
    Dismissed,
}

impl ReportResolution {
    fn as_str(self) -> &'static str {
        match self {
            ReportResolution::Resolved => "resolved",
            ReportResolution::Dismissed => "dismissed",
        }
    }
}

/// Close a pending report; admin only, terminal
#[derive(Debug, Clone)]
pub struct ResolveReport {
    pub caller_id: String,
    pub report_id: String,
    pub resolution: ReportResolution,
}

impl Gateway {
    pub async fn set_user_status(&self, cmd: SetUserStatus) -> Result<()> {
        self.observed("set user status", async {
            self.require_admin(&cmd.caller_id).await?;
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.target_id,
                    vec![FieldOp::Set {
                        path: "status".into(),
                        value: serde_json::to_value(cmd.status)?,
                    }],
                )
                .await?;
            info!(target = cmd.target_id, status = ?cmd.status, "user status changed");
            Ok(())
        })
        .await
    }

    pub async fn set_admin(&self, cmd: SetAdmin) -> Result<()> {
        self.observed("set admin", async {
            self.require_admin(&cmd.caller_id).await?;
            if cmd.caller_id == cmd.target_id {
                return Err(EngineError::Denied(
                    "cannot change your own admin flag".into(),
                ));
            }
            self.store()
                .apply(
                    USER_COLLECTION,
                    &cmd.target_id,
                    vec![FieldOp::Set {
                        path: "isAdmin".into(),
                        value: json!(cmd.is_admin),
                    }],
                )
                .await?;
            info!(target = cmd.target_id, admin = cmd.is_admin, "admin flag changed");
            Ok(())
        })
        .await
    }

    pub async fn file_report(&self, cmd: FileReport) -> Result<Report> {
        self.observed("file report", async {
            if cmd.reason.trim().is_empty() {
                return Err(EngineError::Denied("a report needs a reason".into()));
            }
            let report = Report::new(
                cmd.reporter_id,
                cmd.target_collection,
                cmd.target_id,
                cmd.reason,
            );
            self.store()
                .insert(REPORT_COLLECTION, serde_json::to_value(&report)?)
                .await?;
            Ok(report)
        })
        .await
    }

    pub async fn resolve_report(&self, cmd: ResolveReport) -> Result<()> {
        self.observed("resolve report", async {
            self.require_admin(&cmd.caller_id).await?;
            let caller = cmd.caller_id.clone();
            let resolution = cmd.resolution;
            self.store()
                .transform(
                    REPORT_COLLECTION,
                    &cmd.report_id,
                    Box::new(move |doc| {
                        if doc.get("status").and_then(Value::as_str) != Some("pending") {
                            return Err(EngineError::Conflict(
                                "report is already closed".into(),
                            ));
                        }
                        Ok(vec![
                            FieldOp::Set {
                                path: "status".into(),
                                value: json!(resolution.as_str()),
                            },
                            FieldOp::Set {
                                path: "resolvedBy".into(),
                                value: json!(caller),
                            },
                        ])
                    }),
                )
                .await?;
            info!(report = cmd.report_id, "report closed");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_wire_values() {
        assert_eq!(ReportResolution::Resolved.as_str(), "resolved");
        assert_eq!(ReportResolution::Dismissed.as_str(), "dismissed");
    }
}
