//! The user's photo selection.
//!
//! [`UploadBatch`] enforces the two intake rules:
//!
//! - only `image/*` files are accepted; anything else is dropped and counted
//! - an addition that would push the batch over its cap is rejected whole,
//!   leaving the existing selection untouched
//!
//! [`collect_image_files`] turns CLI paths (files and directories) into
//! [`ImageFile`]s for the batch.

use crate::error::PhotoVibeError;
use crate::media::{mime_from_path, ImageFile};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What an accepted addition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Files appended to the batch.
    pub added: usize,
    /// Files dropped because their MIME type is not `image/*`.
    pub skipped_non_images: usize,
}

/// Ordered, capped sequence of photos.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    files: Vec<ImageFile>,
    cap: usize,
}

impl UploadBatch {
    pub fn new(cap: usize) -> Self {
        Self {
            files: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Append `incoming`, filtering non-images.
    ///
    /// # Errors
    /// [`PhotoVibeError::SelectionLimitExceeded`] when the images in
    /// `incoming` would not fit; the batch is unchanged in that case.
    pub fn add(
        &mut self,
        incoming: impl IntoIterator<Item = ImageFile>,
    ) -> Result<AddOutcome, PhotoVibeError> {
        let (images, others): (Vec<_>, Vec<_>) =
            incoming.into_iter().partition(ImageFile::is_image);

        for file in &others {
            warn!(
                "Skipping non-image file '{}' ({})",
                file.name, file.mime_type
            );
        }

        if self.files.len() + images.len() > self.cap {
            return Err(PhotoVibeError::SelectionLimitExceeded {
                current: self.files.len(),
                attempted: images.len(),
                cap: self.cap,
            });
        }

        let added = images.len();
        self.files.extend(images);
        debug!(
            "Selection now holds {}/{} photos",
            self.files.len(),
            self.cap
        );

        Ok(AddOutcome {
            added,
            skipped_non_images: others.len(),
        })
    }

    /// Remove the photo at `index`. Out-of-range indices return `None`.
    pub fn remove(&mut self, index: usize) -> Option<ImageFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[ImageFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Room left before the cap.
    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.files.len())
    }
}

/// Expand files and directories into photo handles.
///
/// Files are taken as given (their MIME type decides later whether the batch
/// accepts them). Directories contribute only entries whose extension maps
/// to an `image/*` type, sorted by path for a stable order.
///
/// # Errors
/// [`PhotoVibeError::FileNotFound`] when a path does not exist.
pub fn collect_image_files(
    paths: &[PathBuf],
    recursive: bool,
) -> Result<Vec<ImageFile>, PhotoVibeError> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(ImageFile::from_path(path));
        } else if path.is_dir() {
            let mut found = Vec::new();
            collect_from_dir(path, recursive, &mut found);
            found.sort();
            files.extend(found.into_iter().map(ImageFile::from_path));
        } else {
            return Err(PhotoVibeError::FileNotFound { path: path.clone() });
        }
    }

    Ok(files)
}

fn collect_from_dir(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && mime_from_path(&path).starts_with("image/") {
            out.push(path);
        } else if path.is_dir() && recursive {
            collect_from_dir(&path, recursive, out);
        }
    }
}
