use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use rotation_model::{OrderMode, STATE_FILE_NAME};
use serde::Deserialize;

use crate::error::Error;

/// Environment variable naming the wallpaper folder when neither the CLI nor
/// the config file does.
pub const FOLDER_ENV: &str = "WALLPAPER_DIR";

/// Placeholder replaced with the image path in command painter templates.
pub const PATH_PLACEHOLDER: &str = "{path}";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Folder holding the wallpapers to rotate.
    pub wallpaper_folder: Option<PathBuf>,
    /// Explicit state file location; defaults to a hidden file in the folder.
    pub state_file: Option<PathBuf>,
    /// Operator order override applied to the persisted state on rotate.
    pub order: Option<OrderMode>,
    /// Random mode avoids this many recently shown images when it can.
    pub recent_history: usize,
    /// Optional deterministic seed for random selection.
    pub seed: Option<u64>,
    /// Upper bounds for blocking work so a stuck run cannot wedge the next.
    pub timeouts: Timeouts,
    /// How wallpapers are actually applied.
    pub painter: PainterConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            wallpaper_folder: None,
            state_file: None,
            order: None,
            recent_history: 0,
            seed: None,
            timeouts: Timeouts::default(),
            painter: PainterConfig::default(),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::from_yaml_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        if let Some(folder) = &self.wallpaper_folder {
            ensure!(
                !folder.as_os_str().is_empty(),
                "wallpaper-folder must not be empty"
            );
        }
        if let Some(state_file) = &self.state_file {
            ensure!(
                state_file.file_name().is_some(),
                "state-file must name a file"
            );
        }
        self.timeouts.validate()?;
        self.painter.validate()?;
        Ok(self)
    }

    /// Where the rotation state for `folder` lives.
    pub fn state_path(&self, folder: &Path) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| folder.join(STATE_FILE_NAME))
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Timeouts {
    /// Listing the wallpaper folder.
    #[serde(with = "humantime_serde")]
    pub scan: Duration,
    /// Reading or writing the state file.
    #[serde(with = "humantime_serde")]
    pub state_io: Duration,
    /// A single painter invocation, including capability probes.
    #[serde(with = "humantime_serde")]
    pub painter: Duration,
}

impl Timeouts {
    const fn default_scan() -> Duration {
        Duration::from_secs(10)
    }

    const fn default_state_io() -> Duration {
        Duration::from_secs(5)
    }

    const fn default_painter() -> Duration {
        Duration::from_secs(30)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("scan", self.scan),
            ("state-io", self.state_io),
            ("painter", self.painter),
        ] {
            ensure!(!value.is_zero(), "timeouts.{field} must be positive");
        }
        Ok(())
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            scan: Self::default_scan(),
            state_io: Self::default_state_io(),
            painter: Self::default_painter(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PainterBackend {
    /// `virtual-desktop` on Windows, `system` elsewhere.
    #[default]
    Auto,
    /// PowerShell VirtualDesktop module with single-desktop fallback.
    VirtualDesktop,
    /// The platform wallpaper API; active desktop only.
    System,
    /// An operator-supplied shell command.
    Command,
}

impl PainterBackend {
    /// Resolve `Auto` for the platform this binary was built for.
    pub fn resolved(self) -> Self {
        match self {
            Self::Auto if cfg!(windows) => Self::VirtualDesktop,
            Self::Auto => Self::System,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PainterConfig {
    pub backend: PainterBackend,
    /// PowerShell executable used by the virtual-desktop backend.
    pub powershell: String,
    pub command: Option<CommandPainterConfig>,
}

impl Default for PainterConfig {
    fn default() -> Self {
        Self {
            backend: PainterBackend::default(),
            powershell: "powershell".to_string(),
            command: None,
        }
    }
}

impl PainterConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.powershell.trim().is_empty(),
            "painter.powershell must not be blank"
        );
        if self.backend == PainterBackend::Command {
            ensure!(
                self.command.is_some(),
                "painter.command is required when painter.backend is command"
            );
        }
        if let Some(command) = &self.command {
            command.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandPainterConfig {
    /// Shell command applying `{path}` as the wallpaper.
    pub apply: String,
    /// Optional shell command whose success means all desktops are covered.
    #[serde(default)]
    pub probe: Option<String>,
    /// Declares multi-desktop support without running a probe.
    #[serde(default)]
    pub multi_desktop: bool,
}

impl CommandPainterConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.apply.trim().is_empty(),
            "painter.command.apply must not be blank"
        );
        ensure!(
            self.apply.contains(PATH_PLACEHOLDER),
            "painter.command.apply must contain the {PATH_PLACEHOLDER} placeholder"
        );
        if let Some(probe) = &self.probe {
            ensure!(
                !probe.trim().is_empty(),
                "painter.command.probe must not be blank when provided"
            );
        }
        Ok(())
    }
}
