//! Configuration types for photo analysis.
//!
//! All run behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it easy
//! to share configs across tasks, log them, and diff two runs.
//!
//! The prompt text and candidate passions are configuration too
//! ([`PromptProfile`]), so the same pipeline serves every use case.

use crate::error::PhotoVibeError;
use crate::pipeline::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use crate::prompts::{Preset, PromptProfile};
use crate::transport::Transport;
use std::fmt;
use std::sync::Arc;

/// Default Gemini REST endpoint (API version included).
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Maximum number of photos in one selection.
pub const DEFAULT_MAX_FILES: usize = 25;

/// Largest base64 payload sent inline. Gemini rejects inline data above ~20 MB.
pub const DEFAULT_MAX_INLINE_BYTES: u64 = 20 * 1024 * 1024;

/// Environment variables searched, in order, when no key is configured.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Configuration for a photo analysis run.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_photovibe::{AnalysisConfig, Preset};
///
/// let config = AnalysisConfig::builder()
///     .preset(Preset::Nightlife)
///     .model("gemini-2.5-flash")
///     .max_attempts(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// API credential. If None, read from [`API_KEY_ENV_VARS`] at run start.
    pub api_key: Option<String>,

    /// Base URL of the generative API, without a trailing slash.
    pub endpoint: String,

    /// Model identifier, e.g. "gemini-2.5-flash".
    pub model: String,

    /// Pre-constructed transport. If None, an [`crate::transport::HttpTransport`]
    /// is built from `request_timeout_secs`.
    pub transport: Option<Arc<dyn Transport>>,

    /// Prompt template, candidate passions and metadata switch.
    pub profile: PromptProfile,

    /// Selection cap. Default: 25.
    pub max_files: usize,

    /// Total attempts per photo, including the first. Default: 3.
    ///
    /// Only HTTP 429 and network failures are retried. Any other error
    /// status is final on the first attempt.
    pub max_attempts: u32,

    /// Base backoff in milliseconds, doubled after each attempt. Default: 500.
    pub retry_base_delay_ms: u64,

    /// Upper bound of the random jitter added to each backoff. Default: 250.
    pub max_jitter_ms: u64,

    /// Per-request timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Sampling temperature sent in `generationConfig`. Default: 0.4.
    pub temperature: f32,

    /// Photos whose base64 encoding exceeds this fail preprocessing. Default: 20 MiB.
    pub max_inline_bytes: u64,

    /// Optional per-photo progress callback for the eager API.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            transport: None,
            profile: PromptProfile::default(),
            max_files: DEFAULT_MAX_FILES,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            max_jitter_ms: 250,
            request_timeout_secs: 60,
            temperature: 0.4,
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field(
                "transport",
                &self.transport.as_ref().map(|_| "<dyn Transport>"),
            )
            .field("profile", &self.profile.name)
            .field("max_files", &self.max_files)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("max_jitter_ms", &self.max_jitter_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_inline_bytes", &self.max_inline_bytes)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The retry policy derived from this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay_ms: self.retry_base_delay_ms,
            max_jitter_ms: self.max_jitter_ms,
        }
    }

    /// Full `generateContent` URL for the configured model.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Resolve the API key from the config, then the process environment.
    ///
    /// # Errors
    /// [`PhotoVibeError::ApiKeyMissing`] when no non-empty key is found.
    pub fn resolve_api_key(&self) -> Result<String, PhotoVibeError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Like [`Self::resolve_api_key`] but with an injectable environment lookup.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String, PhotoVibeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or_else(|| PhotoVibeError::ApiKeyMissing {
                hint: format!(
                    "Set {} or pass --api-key before starting an analysis.",
                    API_KEY_ENV_VARS.join(" or ")
                ),
            })
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.config.profile = preset.profile();
        self
    }

    pub fn profile(mut self, profile: PromptProfile) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn max_files(mut self, n: usize) -> Self {
        self.config.max_files = n.max(1);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn max_jitter_ms(mut self, ms: u64) -> Self {
        self.config.max_jitter_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_inline_bytes(mut self, bytes: u64) -> Self {
        self.config.max_inline_bytes = bytes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, PhotoVibeError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(PhotoVibeError::InvalidConfig("Model must not be empty".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(PhotoVibeError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.profile.passions.is_empty() {
            return Err(PhotoVibeError::InvalidConfig(
                "Prompt profile needs at least one candidate passion".into(),
            ));
        }
        if c.max_inline_bytes == 0 {
            return Err(PhotoVibeError::InvalidConfig("max_inline_bytes must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.max_files, 25);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.model, DEFAULT_MODEL);
        assert!(c.profile.include_metadata);
    }

    #[test]
    fn generate_url_trims_trailing_slash() {
        let c = AnalysisConfig::builder()
            .endpoint("http://localhost:8080/v1beta/")
            .model("gemini-test")
            .build()
            .unwrap();
        assert_eq!(
            c.generate_url(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn builder_clamps() {
        let c = AnalysisConfig::builder()
            .max_attempts(0)
            .max_files(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.max_attempts, 1);
        assert_eq!(c.max_files, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_bad_endpoint() {
        let err = AnalysisConfig::builder()
            .endpoint("ftp://nope")
            .build()
            .unwrap_err();
        assert!(matches!(err, PhotoVibeError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_passions() {
        let profile = PromptProfile::new("empty", "{passions}", &[] as &[&str]);
        let err = AnalysisConfig::builder()
            .profile(profile)
            .build()
            .unwrap_err();
        assert!(matches!(err, PhotoVibeError::InvalidConfig(_)));
    }

    #[test]
    fn api_key_prefers_config() {
        let c = AnalysisConfig::builder()
            .api_key("from-config")
            .build()
            .unwrap();
        let key = c.resolve_api_key_with(|_| Some("from-env".into())).unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn api_key_falls_back_to_env_in_order() {
        let c = AnalysisConfig::default();
        let key = c
            .resolve_api_key_with(|name| match name {
                "GEMINI_API_KEY" => Some("   ".into()),
                "GOOGLE_API_KEY" => Some("google".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(key, "google");
    }

    #[test]
    fn api_key_missing_is_reported() {
        let c = AnalysisConfig::default();
        let err = c.resolve_api_key_with(|_| None).unwrap_err();
        assert!(matches!(err, PhotoVibeError::ApiKeyMissing { .. }));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = AnalysisConfig::builder()
            .api_key("secret-key")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn retry_policy_mirrors_config() {
        let c = AnalysisConfig::builder()
            .max_attempts(5)
            .retry_base_delay_ms(10)
            .max_jitter_ms(0)
            .build()
            .unwrap();
        let p = c.retry_policy();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.base_delay_ms, 10);
        assert_eq!(p.max_jitter_ms, 0);
    }
}
