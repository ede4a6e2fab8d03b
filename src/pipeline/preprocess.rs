//! Preprocessing: photo bytes → base64 payload + metadata context.
//!
//! Every photo is prepared independently and concurrently. A failure (file
//! vanished, permission denied, too large for an inline upload) is recorded
//! on that photo only; its siblings carry on. Results come back in selection
//! order regardless of which photo finished first.
//!
//! Base64 encoding of a multi-megabyte photo is CPU work, so it runs on the
//! blocking pool via `spawn_blocking` rather than stalling the async workers.

use crate::error::ItemError;
use crate::media::{sniff_mime, FileSource, ImageFile, FALLBACK_MIME};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// One photo after preprocessing. Immutable; consumed by inference.
#[derive(Debug, Clone)]
pub struct PreprocessedItem {
    pub index: usize,
    pub file_name: String,
    /// Possibly refined by sniffing when the extension was unknown.
    pub mime_type: String,
    /// Base64 payload; absent when `error` is set.
    pub payload: Option<String>,
    /// Context line for the prompt; empty when metadata is disabled or unknown.
    pub metadata_context: String,
    pub error: Option<ItemError>,
}

/// Options for [`preprocess_all`].
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub include_metadata: bool,
    pub max_inline_bytes: u64,
}

/// Prepare every photo concurrently; output is index-aligned with `files`.
pub async fn preprocess_all(
    files: &[ImageFile],
    options: PreprocessOptions,
) -> Vec<PreprocessedItem> {
    join_all(
        files
            .iter()
            .enumerate()
            .map(|(index, file)| preprocess_one(index, file, options)),
    )
    .await
}

/// Prepare a single photo. Never fails; errors land in `PreprocessedItem::error`.
pub async fn preprocess_one(
    index: usize,
    file: &ImageFile,
    options: PreprocessOptions,
) -> PreprocessedItem {
    let mut item = PreprocessedItem {
        index,
        file_name: file.name.clone(),
        mime_type: file.mime_type.clone(),
        payload: None,
        metadata_context: String::new(),
        error: None,
    };

    if options.include_metadata {
        item.metadata_context = metadata_context(file).await;
    }

    match read_and_encode(file, options.max_inline_bytes).await {
        Ok((payload, sniffed)) => {
            if item.mime_type == FALLBACK_MIME {
                if let Some(mime) = sniffed {
                    item.mime_type = mime.to_string();
                }
            }
            if !item.mime_type.to_ascii_lowercase().starts_with("image/") {
                item.error = Some(ItemError::PreprocessFailed {
                    file: item.file_name.clone(),
                    detail: format!("unsupported file type '{}'", item.mime_type),
                });
                warn!("Skipping '{}': not an image", item.file_name);
                return item;
            }
            debug!(
                "Prepared '{}': {} bytes base64",
                item.file_name,
                payload.len()
            );
            item.payload = Some(payload);
        }
        Err(detail) => {
            warn!("Preprocessing failed for '{}': {}", item.file_name, detail);
            item.error = Some(ItemError::PreprocessFailed {
                file: item.file_name.clone(),
                detail,
            });
        }
    }

    item
}

async fn read_and_encode(
    file: &ImageFile,
    max_bytes: u64,
) -> Result<(String, Option<&'static str>), String> {
    let bytes: Arc<[u8]> = match &file.source {
        FileSource::Memory(bytes) => Arc::clone(bytes),
        FileSource::Path(path) => {
            let meta = tokio::fs::metadata(path)
                .await
                .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
            if inline_len(meta.len()) > max_bytes {
                return Err(too_large(meta.len(), max_bytes));
            }
            tokio::fs::read(path)
                .await
                .map_err(|e| format!("cannot read '{}': {e}", path.display()))?
                .into()
        }
    };

    if bytes.is_empty() {
        return Err("file is empty".to_string());
    }
    if inline_len(bytes.len() as u64) > max_bytes {
        return Err(too_large(bytes.len() as u64, max_bytes));
    }

    let sniffed = sniff_mime(&bytes);
    let payload = tokio::task::spawn_blocking(move || STANDARD.encode(&bytes))
        .await
        .map_err(|e| format!("encoding task failed: {e}"))?;

    Ok((payload, sniffed))
}

/// Size of the padded base64 payload for `raw_len` bytes of input.
fn inline_len(raw_len: u64) -> u64 {
    usize::try_from(raw_len)
        .ok()
        .and_then(|n| base64::encoded_len(n, true))
        .map_or(u64::MAX, |n| n as u64)
}

fn too_large(len: u64, max: u64) -> String {
    format!(
        "file is {:.1} MiB ({:.1} MiB as base64), above the {:.1} MiB inline upload limit",
        len as f64 / 1_048_576.0,
        inline_len(len) as f64 / 1_048_576.0,
        max as f64 / 1_048_576.0
    )
}

/// Best-effort capture-date context. Never fails; unknown dates yield "".
async fn metadata_context(file: &ImageFile) -> String {
    let captured = match (file.captured_at, &file.source) {
        (Some(at), _) => Some(at),
        (None, FileSource::Path(path)) => tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from),
        (None, FileSource::Memory(_)) => None,
    };

    captured.map(format_capture_date).unwrap_or_default()
}

/// Render the context line offered to the model.
pub fn format_capture_date(at: DateTime<Utc>) -> String {
    format!("Photo taken on {}.", at.format("%A %-d %B %Y at %H:%M UTC"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opts() -> PreprocessOptions {
        PreprocessOptions {
            include_metadata: true,
            max_inline_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn encodes_memory_bytes() {
        let file = ImageFile::from_bytes("a.jpg", "image/jpeg", b"abc".to_vec());
        let item = preprocess_one(0, &file, opts()).await;
        assert_eq!(item.payload.as_deref(), Some("YWJj"));
        assert!(item.error.is_none());
        assert_eq!(item.metadata_context, "");
    }

    #[tokio::test]
    async fn caller_capture_time_wins() {
        let at = Utc.with_ymd_and_hms(2024, 7, 14, 21, 5, 0).unwrap();
        let file =
            ImageFile::from_bytes("a.jpg", "image/jpeg", b"abc".to_vec()).with_captured_at(at);
        let item = preprocess_one(0, &file, opts()).await;
        assert_eq!(
            item.metadata_context,
            "Photo taken on Sunday 14 July 2024 at 21:05 UTC."
        );
    }

    #[tokio::test]
    async fn metadata_skipped_when_disabled() {
        let at = Utc.with_ymd_and_hms(2024, 7, 14, 21, 5, 0).unwrap();
        let file =
            ImageFile::from_bytes("a.jpg", "image/jpeg", b"abc".to_vec()).with_captured_at(at);
        let item = preprocess_one(
            0,
            &file,
            PreprocessOptions {
                include_metadata: false,
                ..opts()
            },
        )
        .await;
        assert!(item.metadata_context.is_empty());
    }

    #[tokio::test]
    async fn oversized_file_fails_in_isolation() {
        let big = ImageFile::from_bytes("big.jpg", "image/jpeg", vec![0u8; 2048]);
        let small = ImageFile::from_bytes("small.jpg", "image/jpeg", vec![1u8; 8]);
        let items = preprocess_all(&[big, small], opts()).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 0);
        assert!(items[0].payload.is_none());
        assert!(matches!(items[0].error, Some(ItemError::PreprocessFailed { .. })));
        assert!(items[1].payload.is_some());
        assert!(items[1].error.is_none());
    }

    #[tokio::test]
    async fn missing_file_is_recorded_not_raised() {
        let file = ImageFile::from_path("/definitely/not/here.jpg");
        let item = preprocess_one(3, &file, opts()).await;
        assert_eq!(item.index, 3);
        let err = item.error.expect("should fail");
        assert!(err.detail().contains("cannot read"));
    }

    #[tokio::test]
    async fn reads_file_from_disk_with_mtime_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"png-ish").unwrap();

        let item = preprocess_one(0, &ImageFile::from_path(&path), opts()).await;
        assert!(item.payload.is_some());
        assert!(item.metadata_context.starts_with("Photo taken on "));
    }

    #[tokio::test]
    async fn unknown_extension_refined_by_sniffing() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let file = ImageFile::from_bytes("blob", FALLBACK_MIME, png);
        let item = preprocess_one(0, &file, opts()).await;
        assert_eq!(item.mime_type, "image/png");
    }

    #[tokio::test]
    async fn non_image_payload_is_rejected() {
        let file = ImageFile::from_bytes("notes", FALLBACK_MIME, b"just text".to_vec());
        let item = preprocess_one(0, &file, opts()).await;
        assert!(item.payload.is_none());
        let detail = item.error.unwrap().detail().to_string();
        assert!(detail.contains("unsupported file type"));
    }

    #[tokio::test]
    async fn empty_file_fails() {
        let file = ImageFile::from_bytes("empty.jpg", "image/jpeg", Vec::<u8>::new());
        let item = preprocess_one(0, &file, opts()).await;
        assert_eq!(item.error.unwrap().detail(), "file is empty");
    }

    #[tokio::test]
    async fn limit_applies_to_encoded_size() {
        // 768 raw bytes encode to exactly 1024 base64 bytes; 769 need 1028.
        let fits = ImageFile::from_bytes("fits.jpg", "image/jpeg", vec![7u8; 768]);
        let over = ImageFile::from_bytes("over.jpg", "image/jpeg", vec![7u8; 769]);
        let items = preprocess_all(&[fits, over], opts()).await;

        assert_eq!(items[0].payload.as_ref().map(String::len), Some(1024));
        assert!(items[0].error.is_none());
        assert!(items[1].payload.is_none());
        let detail = items[1].error.as_ref().unwrap().detail().to_string();
        assert!(detail.contains("inline upload limit"), "got: {detail}");
    }

    #[tokio::test]
    async fn buffer_under_raw_limit_can_still_be_too_large() {
        let file = ImageFile::from_bytes("near.jpg", "image/jpeg", vec![7u8; 1000]);
        let item = preprocess_one(0, &file, opts()).await;
        assert!(item.payload.is_none());
        assert!(matches!(item.error, Some(ItemError::PreprocessFailed { .. })));
    }

    #[tokio::test]
    async fn oversized_file_on_disk_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let item = preprocess_one(1, &ImageFile::from_path(&path), opts()).await;
        assert_eq!(item.index, 1);
        assert!(item.payload.is_none());
        let detail = item.error.unwrap().detail().to_string();
        assert!(detail.contains("inline upload limit"), "got: {detail}");
    }

    #[tokio::test]
    async fn file_on_disk_under_raw_limit_checks_encoded_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("near.png");
        std::fs::write(&path, vec![0u8; 900]).unwrap();

        let item = preprocess_one(0, &ImageFile::from_path(&path), opts()).await;
        assert!(item.payload.is_none());
        assert!(item.error.is_some());
    }

    #[test]
    fn inline_len_is_padded_base64_length() {
        assert_eq!(inline_len(0), 0);
        assert_eq!(inline_len(1), 4);
        assert_eq!(inline_len(3), 4);
        assert_eq!(inline_len(768), 1024);
        assert_eq!(inline_len(15 * 1024 * 1024), 20 * 1024 * 1024);
    }
}
