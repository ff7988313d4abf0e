use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Library error type for wallpaper rotation.
#[derive(Debug, Error)]
pub enum Error {
    /// The wallpaper folder is missing or unreadable.
    #[error("wallpaper folder unavailable: {}: {reason}", .path.display())]
    FolderUnavailable { path: PathBuf, reason: String },

    /// The folder holds no eligible images.
    #[error("no images found in {}", .0.display())]
    CatalogEmpty(PathBuf),

    /// The persisted rotation state could not be parsed or failed validation.
    #[error("rotation state at {} is unusable: {reason}", .path.display())]
    StateCorrupt { path: PathBuf, reason: String },

    /// Multi-desktop wallpaper assignment is not available on this system.
    #[error("multi-desktop wallpaper support unavailable: {0}")]
    PainterUnavailable(String),

    /// The desktop painter failed to apply the image.
    #[error("failed to apply wallpaper {}: {reason}", .path.display())]
    PainterFailure { path: PathBuf, reason: String },

    /// The wallpaper changed but the new state could not be written.
    #[error("failed to persist rotation state to {}: {reason}", .path.display())]
    PersistFailure { path: PathBuf, reason: String },

    /// A bounded operation did not finish in time.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit code reported to the scheduler for this condition.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CatalogEmpty(_) | Self::FolderUnavailable { .. } => 2,
            Self::PainterFailure { .. } => 3,
            Self::Timeout { .. } => 4,
            _ => 1,
        }
    }

    /// `true` when the cycle had nothing to show rather than failing.
    pub fn is_no_image(&self) -> bool {
        matches!(self, Self::CatalogEmpty(_) | Self::FolderUnavailable { .. })
    }
}
