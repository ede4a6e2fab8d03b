//! Model interaction: one prepared photo → one [`VibeAnalysis`].
//!
//! This module is intentionally thin. Prompt text lives in
//! [`crate::prompts`], status classification and backoff in
//! [`super::retry`], and wire formats in [`super::response`]; here they are
//! only wired together.
//!
//! It always returns an [`ItemOutcome`] and never propagates an error
//! upward, so one bad photo cannot abort the rest of the batch.

use crate::config::AnalysisConfig;
use crate::error::{CallError, ItemError, PhotoVibeError};
use crate::output::VibeAnalysis;
use crate::pipeline::preprocess::PreprocessedItem;
use crate::pipeline::response::{build_request, parse_success_body};
use crate::pipeline::retry::{send_with_retry, RetryPolicy};
use crate::prompts::PromptProfile;
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Terminal outcome for one photo.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub result: Result<VibeAnalysis, ItemError>,
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Everything needed to analyse photos against one endpoint.
#[derive(Clone)]
pub struct Inference {
    transport: Arc<dyn Transport>,
    api_key: String,
    url: String,
    profile: PromptProfile,
    policy: RetryPolicy,
    temperature: f32,
}

impl std::fmt::Debug for Inference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inference")
            .field("url", &self.url)
            .field("profile", &self.profile.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Inference {
    pub fn new(config: &AnalysisConfig, api_key: String, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            api_key,
            url: config.generate_url(),
            profile: config.profile.clone(),
            policy: config.retry_policy(),
            temperature: config.temperature,
        }
    }

    /// Build from config: resolve the key, then the transport.
    ///
    /// # Errors
    /// [`PhotoVibeError::ApiKeyMissing`] before any network activity when no
    /// key is available.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, PhotoVibeError> {
        let api_key = config.resolve_api_key()?;
        let transport = resolve_transport(config)?;
        Ok(Self::new(config, api_key, transport))
    }

    /// Analyse one prepared photo.
    ///
    /// A photo that already failed preprocessing is returned as-is with zero
    /// attempts; nothing is sent.
    pub async fn analyze_item(&self, item: &PreprocessedItem) -> ItemOutcome {
        let payload = match (&item.error, &item.payload) {
            (Some(err), _) => {
                return ItemOutcome {
                    result: Err(err.clone()),
                    attempts: 0,
                    duration_ms: 0,
                }
            }
            (None, Some(payload)) => payload,
            (None, None) => {
                return ItemOutcome {
                    result: Err(ItemError::PreprocessFailed {
                        file: item.file_name.clone(),
                        detail: "no payload".to_string(),
                    }),
                    attempts: 0,
                    duration_ms: 0,
                }
            }
        };

        let start = Instant::now();
        let prompt = self.profile.render(&item.metadata_context);
        let body = build_request(&prompt, &item.mime_type, payload, self.temperature);

        let attempted = send_with_retry(&self.policy, |attempt| {
            debug!("'{}': attempt {} → {}", item.file_name, attempt, self.url);
            self.transport.post_json(&self.url, &self.api_key, &body)
        })
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let attempts = attempted.attempts;

        let result = match attempted.outcome {
            Ok(reply) => parse_reply(&item.file_name, &reply.body),
            Err(e) => Err(inference_failed(&item.file_name, attempts, &e)),
        };

        match &result {
            Ok(analysis) => debug!(
                "'{}': {} passions matched in {}ms",
                item.file_name,
                analysis.matched_passions.len(),
                duration_ms
            ),
            Err(e) => warn!("{}", e),
        }

        ItemOutcome {
            result,
            attempts,
            duration_ms,
        }
    }
}

fn parse_reply(file: &str, body: &str) -> Result<VibeAnalysis, ItemError> {
    parse_success_body(body).map_err(|detail| ItemError::MalformedResponse {
        file: file.to_string(),
        detail,
    })
}

fn inference_failed(file: &str, attempts: u32, e: &CallError) -> ItemError {
    ItemError::InferenceFailed {
        file: file.to_string(),
        attempts,
        detail: e.to_string(),
    }
}

/// The configured transport, or a fresh [`HttpTransport`].
pub fn resolve_transport(config: &AnalysisConfig) -> Result<Arc<dyn Transport>, PhotoVibeError> {
    if let Some(ref transport) = config.transport {
        return Ok(Arc::clone(transport));
    }
    let transport = HttpTransport::new(config.request_timeout_secs)
        .map_err(|e| PhotoVibeError::Internal(format!("Failed to build HTTP client: {e}")))?;
    Ok(Arc::new(transport))
}
