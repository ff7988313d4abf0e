use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::trace;

use crate::error::Error;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Captured result of a helper process.
#[derive(Debug)]
pub(crate) struct Finished {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Finished {
    pub fn describe_failure(&self) -> String {
        let stderr = self.stderr.trim();
        let code = self.code.unwrap_or(-1);
        if stderr.is_empty() {
            format!("exited with status {code}")
        } else {
            format!("exited with status {code}: {stderr}")
        }
    }
}

/// Run `command` hidden and capture its output, killing it after `timeout`.
pub(crate) async fn run(
    mut command: Command,
    operation: &'static str,
    timeout: Duration,
) -> Result<Finished, Error> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(windows)]
    command.creation_flags(CREATE_NO_WINDOW);

    trace!(?command, "spawning helper");
    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| Error::Timeout { operation, timeout })??;

    Ok(Finished {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// A platform shell running `script`.
pub(crate) fn shell(script: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(script);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }
}
