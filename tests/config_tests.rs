use std::path::{Path, PathBuf};
use std::time::Duration;

use rotation_model::OrderMode;
use wallpaper_rotator::config::{Configuration, PainterBackend};

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
wallpaper-folder: "/walls"
order: random
recent-history: 3
seed: 7
"#;
    let cfg = Configuration::from_yaml_str(yaml).unwrap().validated().unwrap();
    assert_eq!(cfg.wallpaper_folder, Some(PathBuf::from("/walls")));
    assert_eq!(cfg.order, Some(OrderMode::Random));
    assert_eq!(cfg.recent_history, 3);
    assert_eq!(cfg.seed, Some(7));
}

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert!(cfg.wallpaper_folder.is_none());
    assert!(cfg.order.is_none());
    assert_eq!(cfg.recent_history, 0);
    assert_eq!(cfg.timeouts.scan, Duration::from_secs(10));
    assert_eq!(cfg.timeouts.state_io, Duration::from_secs(5));
    assert_eq!(cfg.timeouts.painter, Duration::from_secs(30));
    assert_eq!(cfg.painter.backend, PainterBackend::Auto);
    assert_eq!(cfg.painter.powershell, "powershell");
    cfg.validated().unwrap();
}

#[test]
fn parse_humantime_timeouts() {
    let yaml = r#"
timeouts:
  scan: 2s
  state-io: 750ms
  painter: 1m 30s
"#;
    let cfg = Configuration::from_yaml_str(yaml).unwrap();
    assert_eq!(cfg.timeouts.scan, Duration::from_secs(2));
    assert_eq!(cfg.timeouts.state_io, Duration::from_millis(750));
    assert_eq!(cfg.timeouts.painter, Duration::from_secs(90));
}

#[test]
fn zero_timeout_is_rejected() {
    let yaml = r#"
timeouts:
  painter: 0s
"#;
    let err = Configuration::from_yaml_str(yaml)
        .unwrap()
        .validated()
        .unwrap_err();
    assert!(err.to_string().contains("timeouts.painter"));
}

#[test]
fn unknown_top_level_key_is_rejected() {
    assert!(Configuration::from_yaml_str("wallpaper-dir: /walls\n").is_err());
}

#[test]
fn bad_order_is_rejected() {
    assert!(Configuration::from_yaml_str("order: shuffle\n").is_err());
}

#[test]
fn command_backend_needs_command_block() {
    let cfg = Configuration::from_yaml_str("painter:\n  backend: command\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn command_apply_needs_placeholder() {
    let yaml = r#"
painter:
  backend: command
  command:
    apply: "feh --bg-fill"
"#;
    let err = Configuration::from_yaml_str(yaml)
        .unwrap()
        .validated()
        .unwrap_err();
    assert!(err.to_string().contains("{path}"));
}

#[test]
fn parse_command_painter() {
    let yaml = r#"
painter:
  backend: command
  command:
    apply: "feh --bg-fill {path}"
    probe: "command -v feh"
    multi-desktop: true
"#;
    let cfg = Configuration::from_yaml_str(yaml).unwrap().validated().unwrap();
    let command = cfg.painter.command.unwrap();
    assert_eq!(command.apply, "feh --bg-fill {path}");
    assert_eq!(command.probe.as_deref(), Some("command -v feh"));
    assert!(command.multi_desktop);
}

#[test]
fn state_file_defaults_into_folder() {
    let cfg = Configuration::default();
    assert_eq!(
        cfg.state_path(Path::new("/walls")),
        PathBuf::from("/walls").join(rotation_model::STATE_FILE_NAME)
    );

    let cfg = Configuration::from_yaml_str("state-file: /var/lib/rotator/state.json\n").unwrap();
    assert_eq!(
        cfg.state_path(Path::new("/walls")),
        PathBuf::from("/var/lib/rotator/state.json")
    );
}

#[test]
fn from_yaml_file_reports_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Configuration::from_yaml_file(tmp.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read config"));
}

#[test]
fn from_yaml_file_reads_config() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, "wallpaper-folder: /walls\norder: sequential\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.order, Some(OrderMode::Sequential));
}
