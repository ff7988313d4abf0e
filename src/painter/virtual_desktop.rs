//! All-desktop wallpapers through the PowerShell `VirtualDesktop` module.
//!
//! Setting the slideshow in Windows collapses per-desktop wallpapers, and
//! the plain system call only reaches the active desktop. The module's
//! `Set-AllDesktopWallpapers` covers every desktop; when it is missing we
//! fall back to the system painter and report the narrower scope.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::process::{self, Finished};
use super::system::SystemPainter;
use super::{DesktopPainter, IMAGE_ENV, PaintScope, ensure_image_exists, painter_failure};
use crate::error::Error;

const PROBE_SCRIPT: &str = r#"
if (Get-Module -ListAvailable -Name VirtualDesktop) {
    Import-Module VirtualDesktop -ErrorAction SilentlyContinue
    if (Get-Command Set-AllDesktopWallpapers -ErrorAction SilentlyContinue) {
        Write-Output 'SUPPORTED'
    } else {
        Write-Output 'COMMAND_MISSING'
    }
} else {
    Write-Output 'MODULE_MISSING'
}
"#;

const APPLY_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
Import-Module VirtualDesktop
Set-AllDesktopWallpapers -Path $env:WALLPAPER_ROTATOR_IMAGE
Write-Output 'APPLIED'
"#;

/// What the probe learned about the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Supported,
    ModuleMissing,
    CommandMissing,
    /// PowerShell could not be run or answered unexpectedly.
    Unavailable(String),
}

impl Capability {
    fn from_probe(done: &Finished) -> Self {
        let out = done.stdout.trim();
        if !done.success {
            Self::Unavailable(done.describe_failure())
        } else if out.contains("SUPPORTED") {
            Self::Supported
        } else if out.contains("COMMAND_MISSING") {
            Self::CommandMissing
        } else if out.contains("MODULE_MISSING") {
            Self::ModuleMissing
        } else {
            Self::Unavailable(format!("unexpected probe output: {out:?}"))
        }
    }

    pub fn hint(&self) -> &str {
        match self {
            Self::Supported => "Set-AllDesktopWallpapers available",
            Self::ModuleMissing => {
                "VirtualDesktop PowerShell module not installed; run: Install-Module VirtualDesktop"
            }
            Self::CommandMissing => {
                "Set-AllDesktopWallpapers not found; update the VirtualDesktop module"
            }
            Self::Unavailable(reason) => reason,
        }
    }
}

#[derive(Debug)]
pub struct VirtualDesktopPainter {
    powershell: String,
    timeout: Duration,
    capability: OnceCell<Capability>,
    fallback: SystemPainter,
}

impl VirtualDesktopPainter {
    pub fn new(powershell: String, timeout: Duration) -> Self {
        Self {
            powershell,
            timeout,
            capability: OnceCell::new(),
            fallback: SystemPainter::new(timeout),
        }
    }

    /// Probe once per process; later calls reuse the answer.
    pub async fn capability(&self) -> &Capability {
        self.capability
            .get_or_init(|| async {
                let capability = match process::run(
                    self.script(PROBE_SCRIPT),
                    "virtual desktop probe",
                    self.timeout,
                )
                .await
                {
                    Ok(done) => Capability::from_probe(&done),
                    Err(err) => Capability::Unavailable(err.to_string()),
                };
                debug!(?capability, "virtual desktop capability probed");
                capability
            })
            .await
    }

    fn script(&self, body: &str) -> Command {
        let mut command = Command::new(&self.powershell);
        command
            .args(["-NoProfile", "-NonInteractive", "-WindowStyle", "Hidden", "-Command"])
            .arg(body);
        command
    }
}

impl DesktopPainter for VirtualDesktopPainter {
    async fn supports_multi_desktop(&self) -> bool {
        *self.capability().await == Capability::Supported
    }

    async fn apply(&self, image: &Path) -> Result<PaintScope, Error> {
        ensure_image_exists(image)?;
        let capability = self.capability().await;
        if *capability != Capability::Supported {
            warn!(reason = capability.hint(), "falling back to single desktop wallpaper");
            return self.fallback.apply(image).await;
        }

        let absolute = std::path::absolute(image)?;
        let mut command = self.script(APPLY_SCRIPT);
        command.env(IMAGE_ENV, &absolute);
        let done = process::run(command, "virtual desktop apply", self.timeout)
            .await
            .map_err(|err| painter_failure(image, err.to_string()))?;
        if done.success && done.stdout.contains("APPLIED") {
            info!(image = %absolute.display(), "wallpaper applied to all desktops");
            Ok(PaintScope::AllDesktops)
        } else {
            Err(painter_failure(image, done.describe_failure()))
        }
    }
}
