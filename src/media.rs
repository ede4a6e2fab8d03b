//! File-like photo handles.
//!
//! An [`ImageFile`] is what the user selected: a display name, a MIME type,
//! and where the bytes live. Bytes are not read until preprocessing, so a
//! selection of 25 large photos costs nothing until a run starts.

use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Used when neither the extension nor the caller says what the file is.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Where a photo's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on disk, read during preprocessing.
    Path(PathBuf),
    /// Bytes already in memory (uploads, tests, other pipelines).
    Memory(Arc<[u8]>),
}

/// A photo in the selection.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub source: FileSource,
    /// Capture time supplied by the caller. Takes precedence over the file's
    /// modification time when the metadata context is derived.
    pub captured_at: Option<DateTime<Utc>>,
}

impl ImageFile {
    /// A file on disk; the MIME type is guessed from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            mime_type: mime_from_path(&path),
            source: FileSource::Path(path),
            captured_at: None,
        }
    }

    /// In-memory bytes with an explicit MIME type.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes.into()),
            captured_at: None,
        }
    }

    pub fn with_captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    /// Whether the MIME type has the `image/` prefix.
    pub fn is_image(&self) -> bool {
        self.mime_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Path(p) => Some(p),
            FileSource::Memory(_) => None,
        }
    }
}

/// Guess a MIME type from the file extension.
///
/// Formats the `image` crate knows map to their registered type. HEIC/HEIF
/// photos (the iPhone default) are not decodable here but the endpoint
/// accepts them, so they are recognised by name.
pub fn mime_from_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "heic" => return "image/heic".to_string(),
        "heif" => return "image/heif".to_string(),
        _ => {}
    }

    ImageFormat::from_extension(&ext)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// Refine a fallback MIME type by sniffing the first bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}
