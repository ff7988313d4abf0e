use std::path::Path;
use std::time::Duration;

use tracing::info;

use super::{DesktopPainter, PaintScope, ensure_image_exists, painter_failure};
use crate::error::Error;

/// Platform wallpaper API via the `wallpaper` crate. Reaches the active
/// desktop only.
#[derive(Debug, Clone)]
pub struct SystemPainter {
    timeout: Duration,
}

impl SystemPainter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl DesktopPainter for SystemPainter {
    async fn supports_multi_desktop(&self) -> bool {
        false
    }

    async fn apply(&self, image: &Path) -> Result<PaintScope, Error> {
        ensure_image_exists(image)?;
        let absolute = std::path::absolute(image)?;
        let path_str = absolute
            .to_str()
            .ok_or_else(|| painter_failure(image, "path is not valid UTF-8"))?
            .to_string();

        let task = tokio::task::spawn_blocking(move || {
            wallpaper::set_from_path(&path_str).map_err(|e| e.to_string())
        });
        let joined = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| Error::Timeout {
                operation: "system wallpaper call",
                timeout: self.timeout,
            })?;
        match joined {
            Ok(Ok(())) => {
                info!(image = %absolute.display(), "wallpaper applied to active desktop");
                Ok(PaintScope::ActiveDesktop)
            }
            Ok(Err(reason)) => Err(painter_failure(image, reason)),
            Err(join) => Err(painter_failure(image, join.to_string())),
        }
    }
}
