use std::path::Path;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::process::{self, shell};
use super::{DesktopPainter, IMAGE_ENV, PaintScope, ensure_image_exists, painter_failure};
use crate::config::{CommandPainterConfig, PATH_PLACEHOLDER};
use crate::error::Error;

/// Operator-supplied shell commands, e.g. `swww img {path}`.
#[derive(Debug)]
pub struct CommandPainter {
    cfg: CommandPainterConfig,
    timeout: Duration,
    multi_desktop: OnceCell<bool>,
}

impl CommandPainter {
    pub fn new(cfg: CommandPainterConfig, timeout: Duration) -> Self {
        Self {
            cfg,
            timeout,
            multi_desktop: OnceCell::new(),
        }
    }

    /// The apply template with `{path}` bound to the image variable, quoted
    /// for the platform shell.
    fn apply_script(&self) -> String {
        let reference = if cfg!(windows) {
            format!("\"%{IMAGE_ENV}%\"")
        } else {
            format!("\"${IMAGE_ENV}\"")
        };
        self.cfg.apply.replace(PATH_PLACEHOLDER, &reference)
    }
}

impl DesktopPainter for CommandPainter {
    async fn supports_multi_desktop(&self) -> bool {
        if self.cfg.multi_desktop {
            return true;
        }
        let Some(probe) = self.cfg.probe.as_deref() else {
            return false;
        };
        *self
            .multi_desktop
            .get_or_init(|| async {
                match process::run(shell(probe), "painter probe", self.timeout).await {
                    Ok(done) => done.success,
                    Err(err) => {
                        debug!(error = %err, "painter probe failed");
                        false
                    }
                }
            })
            .await
    }

    async fn apply(&self, image: &Path) -> Result<PaintScope, Error> {
        ensure_image_exists(image)?;
        let absolute = std::path::absolute(image)?;
        let mut command = shell(&self.apply_script());
        command.env(IMAGE_ENV, &absolute);
        let done = process::run(command, "painter command", self.timeout)
            .await
            .map_err(|err| painter_failure(image, err.to_string()))?;
        if !done.success {
            return Err(painter_failure(image, done.describe_failure()));
        }
        let scope = if self.supports_multi_desktop().await {
            PaintScope::AllDesktops
        } else {
            PaintScope::ActiveDesktop
        };
        info!(image = %absolute.display(), ?scope, "wallpaper applied by command");
        Ok(scope)
    }
}
