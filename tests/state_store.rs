//! Integration tests for the on-disk rotation state.

use std::fs;
use std::sync::mpsc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rotation_model::{ImageMarker, OrderMode, RotationState, STATE_FILE_NAME};
use tempfile::tempdir;
use tokio::runtime::{Builder, Runtime};
use wallpaper_rotator::{Error, StateStore};

fn sample_state() -> RotationState {
    RotationState {
        order_mode: OrderMode::Random,
        current_index: 4,
        last_image_name: Some("e.webp".into()),
        recent_images: vec!["e.webp".into(), "b.png".into()],
        image_count: 9,
        last_image_marker: Some(ImageMarker {
            size: 1234,
            modified: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).single(),
        }),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 9, 0).single(),
        ..RotationState::default()
    }
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    assert_eq!(store.path(), tmp.path().join(STATE_FILE_NAME));

    let state = sample_state();
    store.save(&state).await.unwrap();
    assert_eq!(store.load().await, state);
    assert_eq!(store.read().await.unwrap(), Some(state));
}

#[tokio::test]
async fn missing_file_loads_defaults() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(store.load().await, RotationState::default());
}

#[tokio::test]
async fn corrupt_file_loads_defaults() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());

    for body in [
        "{ not json",
        "",
        r#"{"schema_version": 1, "order_mode": "sequential"}"#,
        r#"{"schema_version": 1, "order_mode": "zigzag", "current_index": 0}"#,
        r#"{"schema_version": 1, "order_mode": "random", "current_index": -7}"#,
    ] {
        fs::write(store.path(), body).unwrap();
        assert!(
            matches!(store.read().await, Err(Error::StateCorrupt { .. })),
            "expected corrupt for {body:?}"
        );
        assert_eq!(store.load().await, RotationState::default());
    }
}

#[tokio::test]
async fn state_from_older_tool_without_optional_fields_loads() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    fs::write(
        store.path(),
        r#"{"schema_version": 1, "order_mode": "sequential", "current_index": 2, "future_field": [1, 2]}"#,
    )
    .unwrap();

    let state = store.load().await;
    assert_eq!(state.current_index, 2);
    assert_eq!(state.last_image_name, None);
}

#[tokio::test]
async fn interrupted_write_leaves_previous_state_readable() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    let state = sample_state();
    store.save(&state).await.unwrap();

    // A writer that died mid-write leaves only its own temp file behind.
    let orphan = tmp.path().join(format!("{STATE_FILE_NAME}.99999.tmp"));
    fs::write(&orphan, r#"{"schema_version": 1, "order_mo"#).unwrap();

    assert_eq!(store.read().await.unwrap(), Some(state.clone()));

    let next = RotationState {
        current_index: 5,
        last_image_name: Some("f.jpg".into()),
        ..state
    };
    store.save(&next).await.unwrap();
    assert_eq!(store.load().await, next);
}

#[tokio::test]
async fn save_leaves_no_temp_files() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    store.save(&sample_state()).await.unwrap();
    store.save(&RotationState::default()).await.unwrap();

    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![STATE_FILE_NAME.to_string()]);
}

#[tokio::test]
async fn failed_save_keeps_previous_state() {
    let tmp = tempdir().unwrap();
    let folder = tmp.path().join("walls");
    fs::create_dir_all(&folder).unwrap();
    let store = StateStore::for_folder(&folder);
    let state = sample_state();
    store.save(&state).await.unwrap();

    // Saving into a folder that no longer exists fails without touching
    // the record we already have elsewhere.
    let orphaned = StateStore::for_folder(&tmp.path().join("missing"));
    let err = orphaned.save(&RotationState::default()).await.unwrap_err();
    assert!(matches!(err, Error::PersistFailure { .. }));
    assert_eq!(store.load().await, state);
}

#[tokio::test]
async fn reset_restores_defaults() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    store.save(&sample_state()).await.unwrap();
    store.reset().await.unwrap();
    assert_eq!(store.read().await.unwrap(), Some(RotationState::default()));
}

#[tokio::test]
async fn custom_location_is_honored() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("rotation.json");
    let store = StateStore::at(&path);
    store.save(&sample_state()).await.unwrap();
    assert!(path.is_file());
    assert!(!tmp.path().join(STATE_FILE_NAME).exists());
}

/// A runtime whose only blocking thread stays busy until the returned
/// sender is dropped, so filesystem work queues behind it.
fn stalled_runtime() -> (Runtime, mpsc::Sender<()>) {
    let rt = Builder::new_current_thread()
        .enable_time()
        .max_blocking_threads(1)
        .build()
        .unwrap();
    let (release, held) = mpsc::channel::<()>();
    rt.spawn_blocking(move || {
        let _ = held.recv();
    });
    (rt, release)
}

/// Release the stalled thread and wait for everything queued behind it.
fn drain(rt: &Runtime, release: mpsc::Sender<()>) {
    drop(release);
    rt.block_on(rt.spawn_blocking(|| ())).unwrap();
}

#[test]
fn slow_read_times_out_and_load_uses_defaults() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    fs::write(store.path(), serde_json::to_vec_pretty(&sample_state()).unwrap()).unwrap();

    let (rt, release) = stalled_runtime();
    let slow = store.clone().with_timeout(Duration::from_millis(20));
    let err = rt.block_on(slow.read()).unwrap_err();
    assert!(matches!(err, Error::Timeout { operation: "state read", .. }));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(rt.block_on(slow.load()), RotationState::default());

    drain(&rt, release);
    assert_eq!(rt.block_on(store.load()), sample_state());
}

#[test]
fn slow_save_times_out_without_leaving_temp_files() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path()).with_timeout(Duration::from_millis(20));
    let state = sample_state();

    let (rt, release) = stalled_runtime();
    let err = rt.block_on(store.save(&state)).unwrap_err();
    assert!(matches!(err, Error::Timeout { operation: "state write", .. }));

    // The abandoned write still runs once the thread frees up, and lands
    // whole through the rename.
    drain(&rt, release);
    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![STATE_FILE_NAME.to_string()]);
    let patient = StateStore::for_folder(tmp.path());
    assert_eq!(rt.block_on(patient.read()).unwrap(), Some(state));
}

#[cfg(unix)]
#[tokio::test]
async fn backslash_in_file_name_round_trips() {
    let tmp = tempdir().unwrap();
    let store = StateStore::for_folder(tmp.path());
    let state = RotationState {
        current_index: 1,
        last_image_name: Some("b\\x.jpg".into()),
        image_count: 3,
        ..RotationState::default()
    };
    store.save(&state).await.unwrap();
    assert_eq!(store.read().await.unwrap(), Some(state));
}
