//! Binary entrypoint for the wallpaper rotator.
//!
//! Each invocation runs one action to completion and exits with a code the
//! scheduler can act on; nothing escapes as a panic.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, error};
use tracing_subscriber::{EnvFilter, fmt};
use wallpaper_rotator::config::{Configuration, FOLDER_ENV};
use wallpaper_rotator::painter::{PaintScope, Painter};
use wallpaper_rotator::{
    Controller, OrderMode, RotationEngine, RotationReport, StateStore, StatusReport,
};

#[derive(Debug, Parser)]
#[command(
    name = "wallpaper-rotator",
    version,
    about = "Rotate desktop wallpapers from a folder across every virtual desktop"
)]
struct Cli {
    /// Path to the wallpaper folder (falls back to the config, then $WALLPAPER_DIR)
    #[arg(short, long, value_name = "DIR")]
    folder: Option<PathBuf>,

    /// Rotation order: sequential or random
    #[arg(short, long, value_name = "ORDER")]
    order: Option<OrderMode>,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show the current rotation without changing anything
    #[arg(short, long, conflicts_with_all = ["reset", "check_support"])]
    status: bool,

    /// Reset the rotation to start from the beginning
    #[arg(short, long, conflicts_with = "check_support")]
    reset: bool,

    /// Check whether wallpapers can be applied to all virtual desktops
    #[arg(long)]
    check_support: bool,

    /// Quiet mode: no normal output, exit code only
    #[arg(short, long)]
    quiet: bool,

    /// Deterministic RNG seed for random order
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn").add_directive(
            format!("wallpaper_rotator={level}")
                .parse()
                .context("building log filter")?,
        ),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let code = match try_main(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = ?err, "wallpaper-rotator exited with error");
            eprintln!("Error: {err:#}");
            1
        }
    };
    // Exit without waiting on blocking tasks a timeout abandoned.
    std::process::exit(code);
}

async fn try_main(cli: Cli) -> Result<i32> {
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?
            .validated()
            .context("invalid configuration values")?,
        None => Configuration::default(),
    };

    let folder = cli
        .folder
        .clone()
        .or_else(|| cfg.wallpaper_folder.clone())
        .or_else(|| std::env::var_os(FOLDER_ENV).map(PathBuf::from))
        .filter(|path| !path.as_os_str().is_empty())
        .with_context(|| {
            format!(
                "no wallpaper folder: pass --folder, set wallpaper-folder in the config, or export {FOLDER_ENV}"
            )
        })?;

    let store = StateStore::at(cfg.state_path(&folder)).with_timeout(cfg.timeouts.state_io);
    let painter = Painter::from_config(&cfg.painter, cfg.timeouts.painter)
        .context("configuring desktop painter")?;
    let rng = match cli.seed.or(cfg.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let engine = RotationEngine::new(rng).with_history_depth(cfg.recent_history);
    let mut controller = Controller::new(folder, store, painter, engine)
        .with_scan_timeout(cfg.timeouts.scan)
        .with_order(cli.order.or(cfg.order));

    let out = Reporter { quiet: cli.quiet };

    if cli.check_support {
        out.support(controller.check_multi_desktop_support().await);
        return Ok(0);
    }

    if cli.status {
        out.status(&controller.status().await);
        return Ok(0);
    }

    if cli.reset {
        return Ok(match controller.reset().await {
            Ok(()) => {
                out.line("Rotation reset to start from beginning.");
                0
            }
            Err(err) => {
                out.line(&format!("Failed to reset rotation: {err}"));
                err.exit_code()
            }
        });
    }

    Ok(match controller.rotate().await {
        Ok(report) => {
            out.rotated(&report);
            0
        }
        Err(err) => {
            out.line(&format!("Failed to change wallpaper: {err}"));
            err.exit_code()
        }
    })
}

/// Human-readable stdout lines, silenced by `--quiet`.
struct Reporter {
    quiet: bool,
}

impl Reporter {
    fn line(&self, text: &str) {
        if !self.quiet {
            println!("{text}");
        }
    }

    fn support(&self, available: bool) {
        if available {
            self.line("Multi-desktop support is available");
        } else {
            self.line("Multi-desktop support not available");
            self.line(
                "Install it with: Install-Module VirtualDesktop (PowerShell, as Administrator)",
            );
        }
    }

    fn status(&self, status: &StatusReport) {
        self.line("Wallpaper Rotator Status:");
        self.line(&format!("  Folder: {}", status.folder.display()));
        if let Some(err) = &status.folder_error {
            self.line(&format!("  Folder problem: {err}"));
        }
        self.line(&format!("  State file: {}", status.state_file.display()));
        self.line(&format!("  Total images: {}", status.total));
        let position = status
            .position
            .map_or_else(|| "not started".to_string(), |pos| pos.to_string());
        self.line(&format!("  Current index: {position}"));
        self.line(&format!(
            "  Current wallpaper: {}",
            status.current_image.as_deref().unwrap_or("none")
        ));
        if status.reconciled
            && let Some(last) = &status.last_image_name
            && status.current_image.as_ref() != Some(last)
        {
            self.line(&format!("  Last shown (no longer present): {last}"));
        }
        self.line(&format!("  Order: {}", status.order_mode));
        if let Some(at) = status.updated_at {
            let ago = (Utc::now() - at)
                .to_std()
                .map(|elapsed| Duration::from_secs(elapsed.as_secs()))
                .unwrap_or_default();
            self.line(&format!(
                "  Last rotated: {} ({} ago)",
                at.to_rfc3339(),
                humantime::format_duration(ago)
            ));
        }
    }

    fn rotated(&self, report: &RotationReport) {
        if report.painter_warning.is_some() {
            self.line("WARNING: Multi-desktop support not available.");
            self.line("   Wallpaper will only change on the current virtual desktop.");
        }
        if report.catalog_changed {
            self.line(&format!("Folder contents changed. Found {} images.", report.total));
        }
        self.line(&format!("Setting wallpaper to: {}", report.image.name));
        let scope = match report.scope {
            PaintScope::AllDesktops => "all desktops",
            PaintScope::ActiveDesktop => "current desktop",
        };
        self.line(&format!(
            "Wallpaper changed successfully ({scope}, {}/{}, {}).",
            report.position + 1,
            report.total,
            report.order_mode
        ));
        if let Some(err) = &report.persist_error {
            self.line(&format!("Warning: {err}"));
        }
    }
}
