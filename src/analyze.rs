//! Eager (whole-batch) analysis entry points.
//!
//! This module provides the simpler API: wait for every photo, then return.
//! It is a consumer of [`crate::stream::analyze_stream`]: it drains the
//! snapshot stream, forwards each resolution to the configured progress
//! callback, and keeps the last snapshot as the final result list. Use the
//! stream directly when you want to render partial results.

use crate::config::AnalysisConfig;
use crate::error::PhotoVibeError;
use crate::media::ImageFile;
use crate::output::{AnalysisOutput, AnalysisStats, ItemState, ResultItem};
use crate::stream::{analyze_stream, RunEvent};
use futures::StreamExt;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Analyse a batch of photos.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(AnalysisOutput)` once every photo is terminal, even if some failed
/// (check `output.stats.failed`, or call [`AnalysisOutput::into_result`]).
///
/// # Errors
/// Returns `Err(PhotoVibeError)` only when the run cannot start:
/// - empty selection, or more photos than `config.max_files`
/// - API key missing
pub async fn analyze(
    files: &[ImageFile],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PhotoVibeError> {
    let total_start = Instant::now();
    let mut snapshots = analyze_stream(files, config).await?;
    let preprocess_duration_ms = total_start.elapsed().as_millis() as u64;

    let total = files.len();
    let mut results: Vec<ResultItem> = Vec::new();

    while let Some(snapshot) = snapshots.next().await {
        if let Some(ref cb) = config.progress_callback {
            match snapshot.event {
                RunEvent::Started => cb.on_run_start(total, snapshot.terminal_count()),
                RunEvent::ItemResolved { index } => {
                    let item = &snapshot.results[index];
                    match (&item.state, &item.error) {
                        (ItemState::Done, _) => cb.on_item_complete(index, total, item),
                        (_, Some(e)) => cb.on_item_error(index, total, e.detail()),
                        _ => {}
                    }
                }
            }
        }
        results = snapshot.results;
    }

    let stats = compute_stats(&results, preprocess_duration_ms, total_start);

    info!(
        "Analysis complete: {}/{} photos, {}ms total",
        stats.succeeded, stats.total_files, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.total_files, stats.succeeded);
    }

    Ok(AnalysisOutput {
        profile: config.profile.name.clone(),
        model: config.model.clone(),
        results,
        stats,
    })
}

/// Analyse photos and write the JSON output directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    files: &[ImageFile],
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PhotoVibeError> {
    let output = analyze(files, config).await?;
    let path = output_path.as_ref();

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| PhotoVibeError::Internal(format!("Failed to serialise output: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PhotoVibeError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| PhotoVibeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PhotoVibeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    files: &[ImageFile],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PhotoVibeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PhotoVibeError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(analyze(files, config))
}

fn compute_stats(
    results: &[ResultItem],
    preprocess_duration_ms: u64,
    total_start: Instant,
) -> AnalysisStats {
    let count = |state: ItemState| results.iter().filter(|r| r.state == state).count();
    let succeeded = count(ItemState::Done);
    let failed = count(ItemState::Error);
    let preprocess_failed = results
        .iter()
        .filter(|r| r.state == ItemState::Error && r.attempts == 0)
        .count();
    let total_duration_ms = total_start.elapsed().as_millis() as u64;

    AnalysisStats {
        total_files: results.len(),
        succeeded,
        failed,
        preprocess_failed,
        total_attempts: results.iter().map(|r| r.attempts as u64).sum(),
        preprocess_duration_ms,
        inference_duration_ms: total_duration_ms.saturating_sub(preprocess_duration_ms),
        total_duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemError;
    use crate::output::{Confidence, MatchedPassion, VibeAnalysis};

    #[test]
    fn stats_split_failures_by_stage() {
        let mut done = ResultItem::pending(0, "a.jpg", "image/jpeg");
        done.state = ItemState::Processing;
        done.complete(
            VibeAnalysis {
                description: "Sunset".into(),
                matched_passions: vec![MatchedPassion {
                    passion_name: "Beach Days".into(),
                    confidence: Confidence::High,
                }],
            },
            2,
            100,
        );

        let mut preprocess = ResultItem::pending(1, "b.jpg", "image/jpeg");
        preprocess.fail(
            ItemError::PreprocessFailed {
                file: "b.jpg".into(),
                detail: "unreadable".into(),
            },
            0,
            0,
        );

        let mut remote = ResultItem::pending(2, "c.jpg", "image/jpeg");
        remote.state = ItemState::Processing;
        remote.fail(
            ItemError::InferenceFailed {
                file: "c.jpg".into(),
                attempts: 1,
                detail: "HTTP 500".into(),
            },
            1,
            50,
        );

        let stats = compute_stats(&[done, preprocess, remote], 5, Instant::now());
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.preprocess_failed, 1);
        assert_eq!(stats.total_attempts, 3);
    }
}
