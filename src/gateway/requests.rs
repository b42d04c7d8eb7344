//! Resource request commands: creation and one-shot fulfillment

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::model::{
    Resource, ResourceRequest, User, REQUEST_COLLECTION, RESOURCE_COLLECTION, USER_COLLECTION,
};
use crate::notify::NotifyEvent;
use crate::remote::FieldOp;
use crate::reputation::{POINTS_CREATE_REQUEST, POINTS_FULFILL_REQUEST};

use super::Gateway;

/// Open a request for material nobody has uploaded yet; awards +5
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub requester_id: String,
    pub title: String,
    pub course_code: String,
    pub description: String,
}

/// Attach an existing resource to an open request.
///
/// The Open -> Fulfilled transition is guarded inside the store transform, so
/// of two racing fulfillers exactly one wins and the other sees a conflict.
#[derive(Debug, Clone)]
pub struct FulfillRequest {
    pub request_id: String,
    pub fulfiller_id: String,
    pub resource_id: String,
}

impl Gateway {
    pub async fn create_request(&self, cmd: CreateRequest) -> Result<ResourceRequest> {
        self.observed("create request", async {
            if cmd.title.trim().is_empty() {
                return Err(EngineError::Denied("a request needs a title".into()));
            }
            let requester: User = self.fetch(USER_COLLECTION, &cmd.requester_id).await?;

            let request = ResourceRequest::new(
                requester.id.clone(),
                requester.display_name.clone(),
                cmd.title,
                cmd.course_code,
                cmd.description,
            );
            self.store()
                .insert(REQUEST_COLLECTION, serde_json::to_value(&request)?)
                .await?;
            self.ledger()
                .award_points(&requester.id, POINTS_CREATE_REQUEST, "resource request")
                .await?;

            info!(request = request.id, "resource request opened");
            Ok(request)
        })
        .await
    }

    pub async fn fulfill_request(&self, cmd: FulfillRequest) -> Result<()> {
        self.observed("fulfill request", async {
            // The resource must exist before we commit the transition
            let resource: Resource = self.fetch(RESOURCE_COLLECTION, &cmd.resource_id).await?;
            let fulfiller: User = self.fetch(USER_COLLECTION, &cmd.fulfiller_id).await?;

            let fulfiller_id = fulfiller.id.clone();
            let resource_id = resource.id.clone();
            let updated = self
                .store()
                .transform(
                    REQUEST_COLLECTION,
                    &cmd.request_id,
                    Box::new(move |doc| {
                        if doc.get("status").and_then(Value::as_str) != Some("open") {
                            return Err(EngineError::Conflict(
                                "request already fulfilled".into(),
                            ));
                        }
                        Ok(vec![
                            FieldOp::Set {
                                path: "status".into(),
                                value: json!("fulfilled"),
                            },
                            FieldOp::Set {
                                path: "fulfillment".into(),
                                value: json!({
                                    "fulfillerId": fulfiller_id,
                                    "resourceId": resource_id,
                                    "fulfilledAt": Utc::now(),
                                }),
                            },
                        ])
                    }),
                )
                .await?;

            self.ledger()
                .award_points(&fulfiller.id, POINTS_FULFILL_REQUEST, "request fulfilled")
                .await?;

            let request: ResourceRequest = serde_json::from_value(updated)?;
            self.notifications()
                .dispatch(NotifyEvent::RequestFulfilled {
                    actor_name: fulfiller.display_name.clone(),
                    request_id: request.id.clone(),
                    resource_id: resource.id.clone(),
                    recipient_id: request.requester_id.clone(),
                })
                .await?;

            info!(
                request = request.id,
                fulfiller = fulfiller.id,
                "request fulfilled"
            );
            Ok(())
        })
        .await
    }
}
