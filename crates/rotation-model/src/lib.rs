//! Persisted rotation record for a wallpaper folder.
//!
//! The record is a plain value: it carries no I/O and is validated on its
//! own so any tool reading `.wallpaper_state.json` applies the same rules.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use anyhow::{Result, ensure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version stamped on every record this crate writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the state file kept beside the images.
pub const STATE_FILE_NAME: &str = ".wallpaper_state.json";

/// `current_index` value meaning "nothing shown yet".
pub const NOT_STARTED: i64 = -1;

/// How the next image is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    #[default]
    Sequential,
    Random,
}

impl OrderMode {
    const NAMES: &'static [&'static str] = &["sequential", "random"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for OrderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "random" => Ok(Self::Random),
            other => Err(format!(
                "unknown order '{other}', expected one of: {}",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Size and modification time of an image, used to notice a file that was
/// replaced in place under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMarker {
    pub size: u64,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// The record persisted once per successful rotation.
///
/// `current_index` is only a hint: the catalog may have shrunk since it was
/// written, so callers re-validate it against the live catalog before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub schema_version: u32,
    pub order_mode: OrderMode,
    pub current_index: i64,
    #[serde(default)]
    pub last_image_name: Option<String>,
    /// Most recent first; bounded by the configured history depth.
    #[serde(default)]
    pub recent_images: Vec<String>,
    #[serde(default)]
    pub image_count: usize,
    #[serde(default)]
    pub last_image_marker: Option<ImageMarker>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            order_mode: OrderMode::default(),
            current_index: NOT_STARTED,
            last_image_name: None,
            recent_images: Vec::new(),
            image_count: 0,
            last_image_marker: None,
            updated_at: None,
        }
    }
}

impl RotationState {
    /// Default record carrying an operator-chosen order.
    pub fn with_order(order_mode: OrderMode) -> Self {
        Self {
            order_mode,
            ..Self::default()
        }
    }

    /// The stored index when it names a slot, `None` for "not started".
    pub fn position(&self) -> Option<usize> {
        usize::try_from(self.current_index).ok()
    }

    pub fn is_started(&self) -> bool {
        self.current_index >= 0 || self.last_image_name.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.schema_version >= 1,
            "schema-version must be at least 1 (got {})",
            self.schema_version
        );
        ensure!(
            self.current_index >= NOT_STARTED,
            "current-index must be >= {NOT_STARTED} (got {})",
            self.current_index
        );
        if let Some(name) = &self.last_image_name {
            ensure!(
                !name.trim().is_empty(),
                "last-image-name must not be blank when provided"
            );
            let mut components = Path::new(name).components();
            ensure!(
                matches!(
                    (components.next(), components.next()),
                    (Some(Component::Normal(_)), None)
                ),
                "last-image-name must be a bare file name (got {name:?})"
            );
        }
        Ok(())
    }
}
