//! Durable rotation state beside the wallpaper folder.
//!
//! Reads never fail the caller: a missing or unusable file yields the
//! default state. Writes go to a per-process temporary file that is synced
//! and renamed over the target, so a concurrent reader sees either the old
//! record or the new one, never a partial write.

use std::future::Future;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rotation_model::{RotationState, STATE_FILE_NAME};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Error;

/// Distinguishes temp files of saves made by one process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    io_timeout: Duration,
}

impl StateStore {
    /// Store using the well-known file name inside `folder`.
    pub fn for_folder(folder: &Path) -> Self {
        Self::at(folder.join(STATE_FILE_NAME))
    }

    /// Store at an explicit file location.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, falling back to defaults on any problem.
    pub async fn load(&self) -> RotationState {
        match self.read().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(path = %self.path.display(), "no rotation state yet; using defaults");
                RotationState::default()
            }
            Err(err) => {
                warn!(error = %err, "ignoring rotation state; using defaults");
                RotationState::default()
            }
        }
    }

    /// Strict read: `Ok(None)` when no file exists, [`Error::StateCorrupt`]
    /// when it exists but cannot be used.
    pub async fn read(&self) -> Result<Option<RotationState>, Error> {
        let bytes = match self.bounded("state read", fs::read(&self.path)).await? {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.corrupt(err.to_string())),
        };
        let state: RotationState =
            serde_json::from_slice(&bytes).map_err(|err| self.corrupt(err.to_string()))?;
        state
            .validate()
            .map_err(|err| self.corrupt(format!("{err:#}")))?;
        Ok(Some(state))
    }

    /// Atomically replace the persisted state with `state`.
    pub async fn save(&self, state: &RotationState) -> Result<(), Error> {
        let mut body = serde_json::to_vec_pretty(state)
            .map_err(|err| self.persist_failure(err.to_string()))?;
        body.push(b'\n');

        // The write runs to completion on its own thread even when the
        // timeout gives up on it, and removes its temp file if it fails.
        let tmp = self.temp_path();
        let target = self.path.clone();
        let task = tokio::task::spawn_blocking(move || write_synced(&tmp, &body, &target));
        match self.bounded("state write", task).await? {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(self.persist_failure(err.to_string())),
            Err(join) => return Err(self.persist_failure(join.to_string())),
        }
        debug!(
            path = %self.path.display(),
            index = state.current_index,
            "rotation state saved"
        );
        Ok(())
    }

    /// Restore the default state without touching any images.
    pub async fn reset(&self) -> Result<(), Error> {
        self.save(&RotationState::default()).await?;
        info!(path = %self.path.display(), "rotation state reset");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STATE_FILE_NAME.into());
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, Error> {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| Error::Timeout {
                operation,
                timeout: self.io_timeout,
            })
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::StateCorrupt {
            path: self.path.clone(),
            reason,
        }
    }

    fn persist_failure(&self, reason: String) -> Error {
        Error::PersistFailure {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Write `body` to `tmp`, sync it, and rename it over `target`. On failure
/// the temp file is removed and `target` keeps its previous contents.
fn write_synced(tmp: &Path, body: &[u8], target: &Path) -> io::Result<()> {
    let written = std::fs::File::create(tmp)
        .and_then(|mut file| {
            file.write_all(body)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(tmp, target));
    if written.is_err()
        && let Err(err) = std::fs::remove_file(tmp)
        && err.kind() != ErrorKind::NotFound
    {
        debug!(path = %tmp.display(), error = %err, "failed to remove temp state file");
    }
    written
}
