//! Desktop painter adapters.
//!
//! A painter applies one image as the desktop background. Backends differ
//! in whether they can reach every virtual desktop; callers ask first and
//! learn from the returned [`PaintScope`] what was actually covered.

mod command;
mod process;
mod system;
mod virtual_desktop;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

pub use command::CommandPainter;
pub use system::SystemPainter;
pub use virtual_desktop::{Capability, VirtualDesktopPainter};

use crate::config::{PainterBackend, PainterConfig};
use crate::error::Error;

/// Environment variable carrying the image path into helper processes, so
/// the path never becomes part of a script's text.
pub(crate) const IMAGE_ENV: &str = "WALLPAPER_ROTATOR_IMAGE";

/// Which desktops an apply call reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintScope {
    AllDesktops,
    ActiveDesktop,
}

/// Capability object for setting the wallpaper.
///
/// When [`supports_multi_desktop`](Self::supports_multi_desktop) is true,
/// `apply` either updates every virtual desktop or reports a failure.
#[allow(async_fn_in_trait)]
pub trait DesktopPainter {
    async fn supports_multi_desktop(&self) -> bool;

    async fn apply(&self, image: &Path) -> Result<PaintScope, Error>;
}

/// The painter selected by configuration.
#[derive(Debug)]
pub enum Painter {
    VirtualDesktop(VirtualDesktopPainter),
    System(SystemPainter),
    Command(CommandPainter),
}

impl Painter {
    pub fn from_config(cfg: &PainterConfig, timeout: Duration) -> Result<Self> {
        let painter = match cfg.backend.resolved() {
            PainterBackend::VirtualDesktop => Self::VirtualDesktop(VirtualDesktopPainter::new(
                cfg.powershell.clone(),
                timeout,
            )),
            PainterBackend::Command => {
                let command = cfg
                    .command
                    .clone()
                    .context("painter.backend is command but painter.command is missing")?;
                Self::Command(CommandPainter::new(command, timeout))
            }
            PainterBackend::System | PainterBackend::Auto => {
                Self::System(SystemPainter::new(timeout))
            }
        };
        tracing::debug!(painter = painter.name(), "desktop painter selected");
        Ok(painter)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::VirtualDesktop(_) => "virtual-desktop",
            Self::System(_) => "system",
            Self::Command(_) => "command",
        }
    }
}

impl DesktopPainter for Painter {
    async fn supports_multi_desktop(&self) -> bool {
        match self {
            Self::VirtualDesktop(p) => p.supports_multi_desktop().await,
            Self::System(p) => p.supports_multi_desktop().await,
            Self::Command(p) => p.supports_multi_desktop().await,
        }
    }

    async fn apply(&self, image: &Path) -> Result<PaintScope, Error> {
        match self {
            Self::VirtualDesktop(p) => p.apply(image).await,
            Self::System(p) => p.apply(image).await,
            Self::Command(p) => p.apply(image).await,
        }
    }
}

pub(crate) fn painter_failure(image: &Path, reason: impl Into<String>) -> Error {
    Error::PainterFailure {
        path: image.to_path_buf(),
        reason: reason.into(),
    }
}

/// Reject paths the OS call would fail on in a less readable way.
pub(crate) fn ensure_image_exists(image: &Path) -> Result<(), Error> {
    if image.is_file() {
        Ok(())
    } else {
        Err(painter_failure(image, "image file not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandPainterConfig;

    #[test]
    fn command_backend_requires_command_block() {
        let cfg = PainterConfig {
            backend: PainterBackend::Command,
            ..PainterConfig::default()
        };
        assert!(Painter::from_config(&cfg, Duration::from_secs(1)).is_err());

        let cfg = PainterConfig {
            backend: PainterBackend::Command,
            command: Some(CommandPainterConfig {
                apply: "true {path}".into(),
                probe: None,
                multi_desktop: false,
            }),
            ..PainterConfig::default()
        };
        let painter = Painter::from_config(&cfg, Duration::from_secs(1)).expect("painter");
        assert_eq!(painter.name(), "command");
    }

    #[test]
    fn auto_backend_matches_platform() {
        let painter =
            Painter::from_config(&PainterConfig::default(), Duration::from_secs(1)).expect("painter");
        if cfg!(windows) {
            assert_eq!(painter.name(), "virtual-desktop");
        } else {
            assert_eq!(painter.name(), "system");
        }
    }

    #[test]
    fn missing_image_is_a_painter_failure() {
        let err = ensure_image_exists(Path::new("/nonexistent/wallpaper.jpg")).unwrap_err();
        assert!(matches!(err, Error::PainterFailure { .. }));
    }
}
