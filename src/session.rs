//! Interactive session state: the selection plus the latest published results.
//!
//! A front-end (desktop app, TUI, web handler) keeps one [`Session`]. The
//! selection and the result list are coupled by two rules:
//!
//! - any change to the selection clears the results
//! - a run's snapshots are only accepted while that run is current
//!
//! Runs are never cancelled. Changing the selection or starting a new run
//! bumps the generation, and [`Session::apply`] silently discards snapshots
//! carrying an older generation. The result list is always replaced
//! wholesale, never patched in place.

use crate::error::PhotoVibeError;
use crate::media::ImageFile;
use crate::output::ResultItem;
use crate::selection::{AddOutcome, UploadBatch};
use crate::stream::RunSnapshot;
use tracing::debug;

/// Handed out by [`Session::begin_run`]; identifies one run.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub generation: u64,
    /// The selection as it was when the run started.
    pub files: Vec<ImageFile>,
}

#[derive(Debug)]
pub struct Session {
    batch: UploadBatch,
    results: Vec<ResultItem>,
    generation: u64,
}

impl Session {
    pub fn new(cap: usize) -> Self {
        Self {
            batch: UploadBatch::new(cap),
            results: Vec::new(),
            generation: 0,
        }
    }

    /// Add photos to the selection.
    ///
    /// # Errors
    /// [`PhotoVibeError::SelectionLimitExceeded`]; selection and results are
    /// left untouched in that case.
    pub fn add_files(
        &mut self,
        files: impl IntoIterator<Item = ImageFile>,
    ) -> Result<AddOutcome, PhotoVibeError> {
        let outcome = self.batch.add(files)?;
        if outcome.added > 0 {
            self.invalidate();
        }
        Ok(outcome)
    }

    /// Remove the photo at `index`. Clears results even when `index` is out
    /// of range, so the caller always sees a consistent empty result list.
    pub fn remove(&mut self, index: usize) -> Option<ImageFile> {
        let removed = self.batch.remove(index);
        self.invalidate();
        removed
    }

    /// Drop the whole selection.
    pub fn clear(&mut self) {
        self.batch.clear();
        self.invalidate();
    }

    /// Start a new run over the current selection.
    ///
    /// # Errors
    /// [`PhotoVibeError::NoFiles`] when nothing is selected.
    pub fn begin_run(&mut self) -> Result<RunTicket, PhotoVibeError> {
        if self.batch.is_empty() {
            return Err(PhotoVibeError::NoFiles);
        }
        self.generation += 1;
        self.results = self
            .batch
            .files()
            .iter()
            .enumerate()
            .map(|(i, f)| ResultItem::pending(i, f.name.clone(), f.mime_type.clone()))
            .collect();
        debug!(
            "Run {} started over {} photos",
            self.generation,
            self.batch.len()
        );
        Ok(RunTicket {
            generation: self.generation,
            files: self.batch.files().to_vec(),
        })
    }

    /// Publish a snapshot from the run identified by `ticket`.
    ///
    /// Returns `false` (and changes nothing) when the ticket is stale.
    pub fn apply(&mut self, ticket: &RunTicket, snapshot: &RunSnapshot) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "Discarding snapshot from run {} (current run {})",
                ticket.generation, self.generation
            );
            return false;
        }
        self.results = snapshot.results.clone();
        true
    }

    pub fn files(&self) -> &[ImageFile] {
        self.batch.files()
    }

    pub fn results(&self) -> &[ResultItem] {
        &self.results
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn invalidate(&mut self) {
        self.results.clear();
        self.generation += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_FILES)
    }
}
