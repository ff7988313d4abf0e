//! Flat directory scanning for wallpaper images.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rotation_model::ImageMarker;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Extensions eligible for rotation (lowercase, without dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// One image found by a scan. Immutable for the lifetime of the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub name: String,
    pub marker: ImageMarker,
}

/// Images of one folder, sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ImageEntry>,
}

impl Catalog {
    /// Builds a catalog, enforcing the ordinal name order.
    pub fn new(mut entries: Vec<ImageEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ImageEntry> {
        self.entries.get(position)
    }

    /// Position of the image called `name`, if it is still present.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.entries
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
            .ok()
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

/// Return `true` if `path` has a supported image extension (case-insensitive).
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|e| *e == ext)
        })
}

/// Scan `folder` (non-recursively) for supported images.
///
/// Symbolic links and subdirectories are skipped. Entries that vanish or
/// cannot be stat'ed mid-scan are left out rather than failing the scan.
///
/// # Errors
/// Returns [`Error::FolderUnavailable`] if `folder` is missing, not a
/// directory, or cannot be listed.
pub fn scan(folder: &Path) -> Result<Catalog, Error> {
    let unavailable = |reason: String| Error::FolderUnavailable {
        path: folder.to_path_buf(),
        reason,
    };

    let meta = fs::metadata(folder).map_err(|err| unavailable(err.to_string()))?;
    if !meta.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }
    // Surface permission problems up front; walkdir would only yield them
    // as per-entry errors.
    fs::read_dir(folder).map_err(|err| unavailable(err.to_string()))?;

    let mut entries = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|res| match res {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
    {
        if let Some(image) = image_entry(&entry) {
            trace!(name = %image.name, "catalog: add");
            entries.push(image);
        }
    }

    let catalog = Catalog::new(entries);
    debug!(folder = %folder.display(), images = catalog.len(), "scan complete");
    Ok(catalog)
}

fn image_entry(entry: &DirEntry) -> Option<ImageEntry> {
    // file_type() does not follow links, so symlinks are excluded here.
    if !entry.file_type().is_file() || !is_supported_image(entry.path()) {
        return None;
    }
    let meta = entry.metadata().ok()?;
    Some(ImageEntry {
        path: entry.path().to_path_buf(),
        name: entry.file_name().to_string_lossy().into_owned(),
        marker: ImageMarker {
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        },
    })
}
