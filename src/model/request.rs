//! Resource request document schema
//!
//! One-way state machine: `Open -> Fulfilled` (terminal). The fulfillment
//! payload is set exactly once, atomically with the transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection name for resource requests
pub const REQUEST_COLLECTION: &str = "resourceRequests";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Open,
    Fulfilled,
}

/// Set once, together with the Open -> Fulfilled transition
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub fulfiller_id: String,
    pub resource_id: String,
    pub fulfilled_at: DateTime<Utc>,
}

/// Resource request document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub id: String,
    pub requester_id: String,
    pub requester_name: String,
    pub title: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment: Option<Fulfillment>,
    pub created_at: DateTime<Utc>,
}

impl ResourceRequest {
    pub fn new(requester_id: String, requester_name: String, title: String, course_code: String, description: String) -> Self {
        Self {
            id: super::new_id(),
            requester_id,
            requester_name,
            title,
            course_code,
            description,
            status: RequestStatus::Open,
            fulfillment: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_open() {
        let req = ResourceRequest::new("u1".into(), "Ada".into(), "CS4006 notes".into(), "CS4006".into(), String::new());
        assert_eq!(req.status, RequestStatus::Open);
        assert!(req.fulfillment.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_value(RequestStatus::Fulfilled).unwrap();
        assert_eq!(json, "fulfilled");
    }
}
