//! One rotation cycle per invocation: scan, load, advance, paint, persist.
//!
//! The persisted state only moves after the painter reports success, so a
//! failed paint never skips an image. A failed save after a good paint is
//! reported but not fatal; the next cycle re-anchors on what it finds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rotation_model::OrderMode;
use tracing::{error, info, instrument, warn};

use crate::error::Error;
use crate::painter::{DesktopPainter, PaintScope};
use crate::rotation::{RotationEngine, reconcile};
use crate::scan::{self, Catalog, ImageEntry};
use crate::store::StateStore;

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a successful [`Controller::rotate`].
#[derive(Debug)]
pub struct RotationReport {
    pub image: ImageEntry,
    pub position: usize,
    pub total: usize,
    pub order_mode: OrderMode,
    pub scope: PaintScope,
    pub reconciled: bool,
    pub catalog_changed: bool,
    /// Set when only the active desktop could be painted.
    pub painter_warning: Option<Error>,
    /// Set when the wallpaper changed but the state was not saved.
    pub persist_error: Option<Error>,
}

impl RotationReport {
    pub fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Read-only view of a folder's rotation.
#[derive(Debug)]
pub struct StatusReport {
    pub folder: PathBuf,
    pub state_file: PathBuf,
    /// `None` when the folder was readable; otherwise why it was not.
    pub folder_error: Option<Error>,
    pub total: usize,
    pub order_mode: OrderMode,
    pub stored_index: i64,
    /// Position of the current image after reconciling with the folder.
    pub position: Option<usize>,
    pub current_image: Option<String>,
    pub last_image_name: Option<String>,
    pub reconciled: bool,
    pub catalog_changed: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct Controller<P> {
    folder: PathBuf,
    store: StateStore,
    painter: P,
    engine: RotationEngine<StdRng>,
    scan_timeout: Duration,
    order: Option<OrderMode>,
}

impl<P: DesktopPainter> Controller<P> {
    pub fn new(
        folder: impl Into<PathBuf>,
        store: StateStore,
        painter: P,
        engine: RotationEngine<StdRng>,
    ) -> Self {
        Self {
            folder: folder.into(),
            store,
            painter,
            engine,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            order: None,
        }
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Operator order applied to the state on each rotate and committed
    /// with it.
    pub fn with_order(mut self, order: Option<OrderMode>) -> Self {
        self.order = order;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }

    /// Advance to the next image and paint it.
    ///
    /// # Errors
    /// [`Error::FolderUnavailable`] or [`Error::CatalogEmpty`] when there is
    /// nothing to show, [`Error::PainterFailure`] when the paint fails, and
    /// [`Error::Timeout`] when the scan does not finish. The persisted state
    /// is untouched in every error case.
    #[instrument(skip(self), fields(folder = %self.folder.display()))]
    pub async fn rotate(&mut self) -> Result<RotationReport, Error> {
        let catalog = self.scan().await?;

        let mut state = self.store.load().await;
        if let Some(order) = self.order {
            state.order_mode = order;
        }
        let order_mode = state.order_mode;

        let result = self.engine.advance(&catalog, state);
        let Some(image) = result.chosen else {
            warn!("no eligible images; nothing to rotate");
            return Err(Error::CatalogEmpty(self.folder.clone()));
        };
        if result.catalog_changed {
            info!(images = catalog.len(), "folder contents changed since last rotation");
        }

        let painter_warning = if self.painter.supports_multi_desktop().await {
            None
        } else {
            let warning = Error::PainterUnavailable(
                "wallpaper will only change on the current virtual desktop".to_string(),
            );
            warn!(%warning, "degrading to single desktop");
            Some(warning)
        };

        let scope = match self.painter.apply(&image.path).await {
            Ok(scope) => scope,
            Err(err) => {
                error!(error = %err, image = %image.name, "wallpaper not applied; state unchanged");
                return Err(err);
            }
        };

        let persist_error = match self.store.save(&result.state).await {
            Ok(()) => None,
            Err(err) => {
                let err = match err {
                    Error::PersistFailure { .. } => err,
                    other => Error::PersistFailure {
                        path: self.store.path().to_path_buf(),
                        reason: other.to_string(),
                    },
                };
                warn!(error = %err, "wallpaper applied but rotation state not saved");
                Some(err)
            }
        };

        let position = result.state.position().unwrap_or_default();
        info!(image = %image.name, position, total = catalog.len(), ?scope, "rotated wallpaper");
        Ok(RotationReport {
            image,
            position,
            total: catalog.len(),
            order_mode,
            scope,
            reconciled: result.reconciled,
            catalog_changed: result.catalog_changed,
            painter_warning,
            persist_error,
        })
    }

    /// Report the rotation without changing anything or calling the painter.
    pub async fn status(&self) -> StatusReport {
        let (catalog, folder_error) = match self.scan().await {
            Ok(catalog) => (catalog, None),
            Err(err) => (Catalog::default(), Some(err)),
        };
        let state = self.store.load().await;
        let rec = reconcile(&catalog, &state);
        let position = rec.anchor.position();
        StatusReport {
            folder: self.folder.clone(),
            state_file: self.store.path().to_path_buf(),
            folder_error,
            total: catalog.len(),
            order_mode: state.order_mode,
            stored_index: state.current_index,
            position,
            current_image: position
                .and_then(|pos| catalog.get(pos))
                .map(|entry| entry.name.clone()),
            last_image_name: state.last_image_name,
            reconciled: rec.reconciled,
            catalog_changed: rec.catalog_changed,
            updated_at: state.updated_at,
        }
    }

    /// Restore the default state; the desktop is left alone.
    pub async fn reset(&self) -> Result<(), Error> {
        self.store.reset().await
    }

    pub async fn check_multi_desktop_support(&self) -> bool {
        self.painter.supports_multi_desktop().await
    }

    async fn scan(&self) -> Result<Catalog, Error> {
        let folder = self.folder.clone();
        let task = tokio::task::spawn_blocking(move || scan::scan(&folder));
        let scanned = tokio::time::timeout(self.scan_timeout, task)
            .await
            .map_err(|_| Error::Timeout {
                operation: "folder scan",
                timeout: self.scan_timeout,
            })?
            .map_err(std::io::Error::other)?;
        if let Err(err) = &scanned {
            warn!(error = %err, "folder unavailable; treating as empty");
        }
        scanned
    }
}
