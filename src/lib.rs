//! # edgequake-photovibe
//!
//! Describe the vibe of your photos and match them against a list of
//! passions using a multimodal LLM (Gemini `generateContent`).
//!
//! For every photo the model returns a short vibe description and the
//! passions it recognises, each tagged `High` (clearly shown) or `Suggested`
//! (hinted at). The answer is constrained by a JSON response schema, so the
//! output is structured data rather than prose.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photos
//!  │
//!  ├─ 1. Select      cap at 25, keep image/* only
//!  ├─ 2. Preprocess  base64 + capture-date context, all photos concurrently
//!  ├─ 3. Infer       one request at a time, retry 429 / network errors
//!  ├─ 4. Parse       schema-checked JSON → VibeAnalysis
//!  └─ 5. Publish     full result list after every photo (Stream)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_photovibe::{analyze, AnalysisConfig, ImageFile, Preset};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY / GOOGLE_API_KEY
//!     let config = AnalysisConfig::builder().preset(Preset::Itinerary).build()?;
//!     let photos = vec![ImageFile::from_path("beach.jpg")];
//!     let output = analyze(&photos, &config).await?;
//!     for item in &output.results {
//!         if let Some(ref a) = item.analysis {
//!             println!("{}: {}", item.file_name, a.description);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `photovibe` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod selection;
pub mod session;
pub mod stream;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_sync, analyze_to_file};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::{CallError, ItemError, PhotoVibeError};
pub use media::{FileSource, ImageFile};
pub use output::{
    AnalysisOutput, AnalysisStats, Confidence, ItemState, MatchedPassion, ResultItem, VibeAnalysis,
};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{Preset, PromptProfile};
pub use selection::{collect_image_files, AddOutcome, UploadBatch};
pub use session::{RunTicket, Session};
pub use stream::{analyze_stream, RunEvent, RunSnapshot, SnapshotStream};
pub use transport::{HttpReply, HttpTransport, Transport};
