//! Streaming analysis API: publish the full result list after every photo.
//!
//! A run takes a few seconds per photo. Instead of pushing progress through
//! callbacks, [`analyze_stream`] returns a `Stream` of [`RunSnapshot`]s that
//! the caller (CLI, UI, test harness) pulls at its own pace:
//!
//! 1. one `Started` snapshot, right after preprocessing: every photo is either
//!    `Processing` or already `Error` (preprocessing failed)
//! 2. one `ItemResolved` snapshot per photo that was sent, in selection order
//!
//! Each snapshot owns a full copy of the result list, so the number of
//! terminal items never decreases from one snapshot to the next.
//!
//! Requests are strictly sequential: the next request is only sent when the
//! caller polls for the next snapshot. This keeps the endpoint's rate limits
//! happy and means a caller that stops polling stops the run.

use crate::config::AnalysisConfig;
use crate::error::PhotoVibeError;
use crate::media::ImageFile;
use crate::output::{terminal_count, ItemState, ResultItem};
use crate::pipeline::inference::{Inference, ItemOutcome};
use crate::pipeline::preprocess::{preprocess_all, PreprocessOptions, PreprocessedItem};
use futures::stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info};

/// What produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    /// Preprocessing finished; no request has been sent yet.
    Started,
    /// The photo at `index` reached a terminal state.
    ItemResolved { index: usize },
}

/// One published state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub event: RunEvent,
    /// Full result list, index-aligned with the selection.
    pub results: Vec<ResultItem>,
}

impl RunSnapshot {
    pub fn terminal_count(&self) -> usize {
        terminal_count(&self.results)
    }

    /// Whether every photo is terminal.
    pub fn is_settled(&self) -> bool {
        self.results.iter().all(ResultItem::is_terminal)
    }
}

/// A boxed stream of run snapshots.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = RunSnapshot> + Send>>;

/// Analyse photos, streaming a snapshot after each one resolves.
///
/// Validation happens up front, before any file is read or request sent.
///
/// # Errors
/// - [`PhotoVibeError::NoFiles`] for an empty selection
/// - [`PhotoVibeError::SelectionLimitExceeded`] above `config.max_files`
/// - [`PhotoVibeError::ApiKeyMissing`] when no key is configured
pub async fn analyze_stream(
    files: &[ImageFile],
    config: &AnalysisConfig,
) -> Result<SnapshotStream, PhotoVibeError> {
    validate_selection(files, config)?;
    let inference = Inference::from_config(config)?;

    info!(
        "Starting analysis of {} photos (profile '{}', model '{}')",
        files.len(),
        config.profile.name,
        config.model
    );

    let start = Instant::now();
    let prepared = preprocess_all(
        files,
        PreprocessOptions {
            include_metadata: config.profile.include_metadata,
            max_inline_bytes: config.max_inline_bytes,
        },
    )
    .await;
    debug!(
        "Preprocessed {} photos in {}ms",
        prepared.len(),
        start.elapsed().as_millis()
    );

    Ok(snapshot_stream(inference, prepared))
}

/// Pre-run checks shared by every entry point.
pub(crate) fn validate_selection(
    files: &[ImageFile],
    config: &AnalysisConfig,
) -> Result<(), PhotoVibeError> {
    if files.is_empty() {
        return Err(PhotoVibeError::NoFiles);
    }
    if files.len() > config.max_files {
        return Err(PhotoVibeError::SelectionLimitExceeded {
            current: 0,
            attempted: files.len(),
            cap: config.max_files,
        });
    }
    Ok(())
}

/// Drive the inference loop over already-prepared photos.
pub fn snapshot_stream(inference: Inference, prepared: Vec<PreprocessedItem>) -> SnapshotStream {
    let results = initial_results(&prepared);
    let state = RunState {
        inference,
        prepared,
        results,
        cursor: 0,
        started: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if !state.started {
            state.started = true;
            let snapshot = state.snapshot(RunEvent::Started);
            return Some((snapshot, state));
        }

        let index =
            (state.cursor..state.prepared.len()).find(|&i| !state.results[i].is_terminal())?;
        state.cursor = index + 1;

        let outcome = state.inference.analyze_item(&state.prepared[index]).await;
        apply_outcome(&mut state.results[index], outcome);

        let snapshot = state.snapshot(RunEvent::ItemResolved { index });
        Some((snapshot, state))
    }))
}

struct RunState {
    inference: Inference,
    prepared: Vec<PreprocessedItem>,
    results: Vec<ResultItem>,
    cursor: usize,
    started: bool,
}

impl RunState {
    fn snapshot(&self, event: RunEvent) -> RunSnapshot {
        RunSnapshot {
            event,
            results: self.results.clone(),
        }
    }
}

/// Photos that failed preprocessing start terminal; the rest start `Processing`.
fn initial_results(prepared: &[PreprocessedItem]) -> Vec<ResultItem> {
    prepared
        .iter()
        .map(|p| {
            let mut item = ResultItem::pending(p.index, p.file_name.clone(), p.mime_type.clone());
            item.metadata = p.metadata_context.clone();
            match &p.error {
                Some(err) => item.fail(err.clone(), 0, 0),
                None => item.state = ItemState::Processing,
            }
            item
        })
        .collect()
}

fn apply_outcome(item: &mut ResultItem, outcome: ItemOutcome) {
    match outcome.result {
        Ok(analysis) => item.complete(analysis, outcome.attempts, outcome.duration_ms),
        Err(err) => item.fail(err, outcome.attempts, outcome.duration_ms),
    }
}
