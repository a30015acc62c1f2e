//! Working tree materialization through the git executable.

use std::path::Path;
use std::process::Stdio;

use dotgit_core::DumpJob;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{DumpError, Result};

/// Failure policy of the checkout step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// A non-zero exit fails the dump.
    Strict,
    /// stderr is discarded and the exit status is only reported.
    BestEffort,
}

fn command(job: &DumpJob, dest: &Path) -> Command {
    let mut cmd = Command::new(job.git_executable());
    cmd.current_dir(dest)
        .args(["-c", "core.hooksPath=/dev/null"])
        .args(["-c", "core.fsmonitor=false"])
        .args(["checkout", "."])
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .kill_on_drop(true);

    if let Some(proxy) = job.proxy() {
        for var in ["ALL_PROXY", "HTTP_PROXY", "HTTPS_PROXY"] {
            cmd.env(var, proxy);
        }
    }
    cmd
}

/// Runs `git checkout .` in `dest` and returns the exit code, if any.
///
/// # Errors
///
/// In [`CheckoutMode::Strict`], returns `DumpError::Checkout` when the
/// command cannot be started or exits non-zero. In best-effort mode only a
/// failure to start the command is reported, as `Ok(None)`.
pub async fn checkout(job: &DumpJob, dest: &Path, mode: CheckoutMode) -> Result<Option<i32>> {
    info!("Running {} checkout . ({:?})", job.git_executable(), mode);
    let mut cmd = command(job, dest);

    match mode {
        CheckoutMode::Strict => {
            let output = cmd
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|e| DumpError::Checkout(format!("{}: {e}", job.git_executable())))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(DumpError::Checkout(format!(
                    "{} ({})",
                    output.status,
                    stderr.trim()
                )));
            }
            Ok(output.status.code())
        },
        CheckoutMode::BestEffort => match cmd.stderr(Stdio::null()).status().await {
            Ok(status) => Ok(status.code()),
            Err(e) => {
                warn!("Could not run {}: {}", job.git_executable(), e);
                Ok(None)
            },
        },
    }
}
