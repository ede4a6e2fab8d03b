//! Wire format of the `generateContent` call: request body, success body,
//! error body.
//!
//! ```text
//! request  {contents:[{parts:[{text},{inlineData:{mimeType,data}}]}],
//!           generationConfig:{responseMimeType,responseSchema,temperature}}
//! success  {candidates:[{content:{parts:[{text:"<JSON>"}]}}]}
//! error    {error:{message,details:[{message}]}}
//! ```

use crate::output::VibeAnalysis;
use crate::pipeline::postprocess::clean_json_text;
use crate::prompts::response_schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Request ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

/// Build the JSON body for one photo: prompt text, then the inline image.
pub fn build_request(prompt: &str, mime_type: &str, base64_data: &str, temperature: f32) -> Value {
    let request = GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Text { text: prompt },
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: base64_data,
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
            temperature,
        },
    };
    // Serialising plain structs of strings and `Value`s cannot fail.
    serde_json::to_value(request).unwrap_or(Value::Null)
}

// ── Success body ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Pull the model's text out of a success body.
///
/// # Errors
/// A human-readable reason when the body is not JSON, the prompt was
/// blocked, or no candidate carries text.
pub fn extract_text(body: &str) -> Result<String, String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| format!("response body is not valid JSON: {e}"))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(format!("prompt was blocked ({reason})"));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| "model returned no candidates".to_string())?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(match candidate.finish_reason.as_deref() {
            Some(reason) if reason != "STOP" => {
                format!("model returned no text (finish reason {reason})")
            }
            _ => "model returned no text".to_string(),
        });
    }

    Ok(text)
}

/// Parse the model's JSON text into a [`VibeAnalysis`].
pub fn parse_analysis(text: &str) -> Result<VibeAnalysis, String> {
    let cleaned = clean_json_text(text);
    serde_json::from_str(&cleaned)
        .map_err(|e| format!("analysis JSON does not match the expected shape: {e}"))
}

/// Success body → analysis, reporting the first failure encountered.
pub fn parse_success_body(body: &str) -> Result<VibeAnalysis, String> {
    let text = extract_text(body)?;
    parse_analysis(&text)
}

// ── Error body ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Best message for a non-success reply.
///
/// `error.message`, else the first non-empty `error.details[].message`,
/// else `HTTP <status>`.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| {
            let ErrorBody { message, details } = env.error;
            message
                .filter(|m| !m.trim().is_empty())
                .or_else(|| {
                    details
                        .into_iter()
                        .filter_map(|d| d.message)
                        .find(|m| !m.trim().is_empty())
                })
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}
