//! Resource commands: create, delete, comment

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::external::{AiAssistant, AiPayload, AI_PLACEHOLDER};
use crate::model::{Comment, Resource, User, RESOURCE_COLLECTION, USER_COLLECTION};
use crate::notify::NotifyEvent;
use crate::remote::{DocumentStore, FieldOp};
use crate::reputation::{POINTS_CREATE_RESOURCE, POINTS_DELETE_RESOURCE};

use super::Gateway;

/// Create a resource; awards +25 and notifies the author's subscribers.
/// AI-derived fields are filled in asynchronously after the insert.
#[derive(Debug, Clone)]
pub struct CreateResource {
    pub author_id: String,
    pub title: String,
    pub description: String,
    pub course_code: String,
    pub lecturer_name: String,
    pub file_url: String,
    pub mime_type: String,
    /// File content for the AI collaborator, already base64-encoded by the
    /// upload path; the engine never inspects it beyond the MIME type
    pub ai_payload: Option<AiPayload>,
}

/// Delete a resource; only the author or an admin may. Nets the author's
/// points back by 25.
#[derive(Debug, Clone)]
pub struct DeleteResource {
    pub resource_id: String,
    pub caller_id: String,
}

/// Append a comment to a resource's denormalized comment list.
///
/// `parent_id` is null or an existing comment's ID; the gateway does not
/// re-validate parent existence at write time (a deleted parent leaves the
/// child addressable under the thread's root bucket).
#[derive(Debug, Clone)]
pub struct AddComment {
    pub resource_id: String,
    pub author_id: String,
    pub text: String,
    pub parent_id: Option<String>,
}

impl Gateway {
    pub async fn create_resource(&self, cmd: CreateResource) -> Result<Resource> {
        self.observed("create resource", async {
            if cmd.title.trim().is_empty() {
                return Err(EngineError::Denied("a resource needs a title".into()));
            }
            let author: User = self.fetch(USER_COLLECTION, &cmd.author_id).await?;

            let resource = Resource {
                id: crate::model::new_id(),
                author_id: author.id.clone(),
                author_name: author.display_name.clone(),
                title: cmd.title,
                description: cmd.description,
                course_code: cmd.course_code,
                lecturer_name: cmd.lecturer_name,
                file_url: cmd.file_url,
                mime_type: cmd.mime_type,
                created_at: chrono::Utc::now(),
                ..Default::default()
            };

            self.store()
                .insert(RESOURCE_COLLECTION, serde_json::to_value(&resource)?)
                .await?;
            self.store()
                .apply(
                    USER_COLLECTION,
                    &author.id,
                    vec![FieldOp::Increment { path: "uploadCount".into(), by: 1 }],
                )
                .await?;
            self.ledger()
                .award_points(&author.id, POINTS_CREATE_RESOURCE, "resource upload")
                .await?;
            self.notifications()
                .dispatch(NotifyEvent::NewResource {
                    actor_id: author.id.clone(),
                    actor_name: author.display_name.clone(),
                    resource_id: resource.id.clone(),
                    title: resource.title.clone(),
                    course_code: resource.course_code.clone(),
                    lecturer_name: resource.lecturer_name.clone(),
                })
                .await?;

            match self.ai() {
                Ok(ai) => {
                    spawn_enrichment(self.store().clone(), ai.clone(), resource.clone(), cmd.ai_payload);
                }
                Err(e) => {
                    // Enrichment degrades to the placeholder, never an error
                    warn!(resource = resource.id, error = %e, "enrichment skipped");
                    self.store()
                        .apply(
                            RESOURCE_COLLECTION,
                            &resource.id,
                            vec![FieldOp::Set {
                                path: "aiSummary".into(),
                                value: json!(AI_PLACEHOLDER),
                            }],
                        )
                        .await?;
                }
            }

            info!(resource = resource.id, author = resource.author_id, "resource created");
            Ok(resource)
        })
        .await
    }

    pub async fn delete_resource(&self, cmd: DeleteResource) -> Result<()> {
        self.observed("delete resource", async {
            let resource: Resource = self.fetch(RESOURCE_COLLECTION, &cmd.resource_id).await?;
            let caller: User = self.fetch(USER_COLLECTION, &cmd.caller_id).await?;
            if caller.id != resource.author_id && !caller.is_admin {
                return Err(EngineError::Denied(
                    "only the author or an admin may delete a resource".into(),
                ));
            }

            self.store().delete(RESOURCE_COLLECTION, &resource.id).await?;
            self.store()
                .apply(
                    USER_COLLECTION,
                    &resource.author_id,
                    vec![FieldOp::Increment { path: "uploadCount".into(), by: -1 }],
                )
                .await?;
            self.ledger()
                .award_points(&resource.author_id, POINTS_DELETE_RESOURCE, "resource deleted")
                .await?;

            info!(resource = resource.id, caller = caller.id, "resource deleted");
            Ok(())
        })
        .await
    }

    pub async fn add_comment(&self, cmd: AddComment) -> Result<Comment> {
        self.observed("add comment", async {
            if cmd.text.trim().is_empty() {
                return Err(EngineError::Denied("a comment needs text".into()));
            }
            let author: User = self.fetch(USER_COLLECTION, &cmd.author_id).await?;
            let comment = Comment::new(
                author.id.clone(),
                author.display_name.clone(),
                cmd.text,
                cmd.parent_id,
            );
            let value = serde_json::to_value(&comment)?;

            self.store()
                .apply(
                    RESOURCE_COLLECTION,
                    &cmd.resource_id,
                    vec![FieldOp::Push { path: "comments".into(), value }],
                )
                .await?;
            Ok(comment)
        })
        .await
    }
}

/// Fill in the AI-derived fields after creation. Failures degrade to a
/// placeholder summary; they are never surfaced to the creating caller.
fn spawn_enrichment(
    store: std::sync::Arc<dyn DocumentStore>,
    ai: std::sync::Arc<dyn AiAssistant>,
    resource: Resource,
    payload: Option<AiPayload>,
) {
    tokio::spawn(async move {
        let context = format!("{}\n\n{}", resource.title, resource.description);

        let summary = match ai.summarize(&context, payload.clone()).await {
            Ok(s) => s,
            Err(e) => {
                warn!(resource = resource.id, error = %e, "AI summary failed");
                AI_PLACEHOLDER.to_string()
            }
        };
        let mut ops = vec![FieldOp::Set { path: "aiSummary".into(), value: json!(summary) }];

        match ai.flashcards(&context, payload.clone()).await {
            Ok(cards) if !cards.is_empty() => {
                ops.push(FieldOp::Set {
                    path: "aiFlashcards".into(),
                    value: serde_json::to_value(cards).unwrap_or(Value::Null),
                });
            }
            Ok(_) => {}
            Err(e) => warn!(resource = resource.id, error = %e, "AI flashcards failed"),
        }
        match ai.quiz(&context, payload).await {
            Ok(questions) if !questions.is_empty() => {
                ops.push(FieldOp::Set {
                    path: "aiQuizQuestions".into(),
                    value: serde_json::to_value(questions).unwrap_or(Value::Null),
                });
            }
            Ok(_) => {}
            Err(e) => warn!(resource = resource.id, error = %e, "AI quiz failed"),
        }

        // The resource may have been deleted while the AI ran; that is fine
        if let Err(e) = store.apply(RESOURCE_COLLECTION, &resource.id, ops).await {
            warn!(resource = resource.id, error = %e, "AI enrichment not applied");
        }
    });
}
