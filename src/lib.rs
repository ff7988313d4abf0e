//! Folder-driven wallpaper rotation that survives folder edits, overlapping
//! runs, and painters without multi-desktop support.

pub mod config;
pub mod controller;
pub mod error;
pub mod painter;
pub mod rotation;
pub mod scan;
pub mod store;

pub use controller::{Controller, RotationReport, StatusReport};
pub use error::Error;
pub use rotation::{RotationEngine, RotationResult};
pub use rotation_model::{OrderMode, RotationState};
pub use scan::{Catalog, ImageEntry};
pub use store::StateStore;
