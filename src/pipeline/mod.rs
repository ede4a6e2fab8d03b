//! Pipeline stages for photo analysis.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! preprocess ──▶ inference ──▶ response ──▶ postprocess
//! (base64,       (prompt +     (wire        (fence / chatter
//!  metadata)      retry)        formats)      cleanup)
//! ```
//!
//! 1. [`preprocess`]: read and base64-encode every photo concurrently and
//!    derive its capture-date context; failures stay on the photo
//! 2. [`inference`]: render the prompt and send one request per photo
//! 3. [`retry`]: classify statuses and back off on 429 / network errors
//! 4. [`response`]: build the request body and decode success / error bodies
//! 5. [`postprocess`]: deterministic cleanup of the model's JSON text

pub mod inference;
pub mod postprocess;
pub mod preprocess;
pub mod response;
pub mod retry;
