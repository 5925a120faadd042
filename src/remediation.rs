use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::EventLog;

const GENERATOR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("suggestion generator is not configured")]
    Unavailable,

    #[error("suggestion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("suggestion generator returned {status}")]
    Status { status: u16 },

    #[error("suggestion generator returned an empty suggestion")]
    Empty,
}

/// Produces remediation advice for a failing pod.
#[async_trait]
pub trait Suggester: Send + Sync {
    async fn suggest(&self, pod_name: &str, reason: &str) -> Result<String, CollaboratorError>;
}

/// Corrective actions against the cluster.
#[async_trait]
pub trait PodActions: Send + Sync {
    async fn delete_pod(&self, name: &str, namespace: &str) -> anyhow::Result<()>;
}

pub fn template_suggestion(pod_name: &str, reason: &str) -> String {
    format!("restart pod {} due to {}", pod_name, reason)
}

pub struct TemplateSuggester;

#[async_trait]
impl Suggester for TemplateSuggester {
    async fn suggest(&self, pod_name: &str, reason: &str) -> Result<String, CollaboratorError> {
        Ok(template_suggestion(pod_name, reason))
    }
}

#[derive(Serialize)]
struct SuggestionRequest<'a> {
    pod: &'a str,
    reason: &'a str,
}

#[derive(Deserialize)]
struct SuggestionResponse {
    suggestion: String,
}

/// Asks an external text-generation service for advice.
///
/// The service receives `{"pod", "reason"}` and answers `{"suggestion"}`.
pub struct GeneratedSuggester {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl GeneratedSuggester {
    pub fn new(endpoint: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(GENERATOR_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, endpoint }
    }
}

#[async_trait]
impl Suggester for GeneratedSuggester {
    async fn suggest(&self, pod_name: &str, reason: &str) -> Result<String, CollaboratorError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(CollaboratorError::Unavailable)?;

        let response = self
            .http
            .post(endpoint)
            .json(&SuggestionRequest {
                pod: pod_name,
                reason,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
            });
        }

        let body: SuggestionResponse = response.json().await?;
        let suggestion = body.suggestion.trim();
        if suggestion.is_empty() {
            return Err(CollaboratorError::Empty);
        }
        Ok(suggestion.to_string())
    }
}

/// Turns a detected failure into advice and, when enabled, a pod deletion.
pub struct RemediationEngine {
    suggester: Box<dyn Suggester>,
    actions: Arc<dyn PodActions>,
    auto_apply: bool,
    log: Arc<EventLog>,
}

impl RemediationEngine {
    pub fn new(
        suggester: Box<dyn Suggester>,
        actions: Arc<dyn PodActions>,
        auto_apply: bool,
        log: Arc<EventLog>,
    ) -> Self {
        Self {
            suggester,
            actions,
            auto_apply,
            log,
        }
    }

    pub fn auto_apply(&self) -> bool {
        self.auto_apply
    }

    /// Never fails: collaborator errors fall back to the template.
    pub async fn suggest(&self, pod_name: &str, reason: &str) -> String {
        match self.suggester.suggest(pod_name, reason).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Suggestion generator failed for pod {}: {}; using template",
                    pod_name, e
                );
                template_suggestion(pod_name, reason)
            }
        }
    }

    /// Delete the pod, recording the outcome. Failures are not retried.
    pub async fn apply(&self, pod_name: &str, namespace: &str) -> bool {
        debug!("Deleting pod {}/{}", namespace, pod_name);
        match self.actions.delete_pod(pod_name, namespace).await {
            Ok(()) => {
                self.log
                    .append(format!("Applied fix: deleted pod {}", pod_name));
                true
            }
            Err(e) => {
                self.log.append(format!(
                    "Error applying fix to pod {}: {:#}",
                    pod_name, e
                ));
                false
            }
        }
    }
}
