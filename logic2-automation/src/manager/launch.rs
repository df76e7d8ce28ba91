/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Locating and spawning a local Logic 2 instance.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::errors::{Result, SaleaeError};

/// A Logic 2 process started by this client.
///
/// The child is spawned with `kill_on_drop`, so it never outlives the
/// [`Manager`](super::Manager) that owns it, even if `close()` is skipped.
#[derive(Debug)]
pub(crate) struct Logic2Process {
    pub(crate) child: Child,
    /// PID at spawn time.  Compared with the `launch_pid` Logic 2 reports to
    /// detect a different instance answering on the port.
    pub(crate) pid: u32,
}

/// Command-line arguments that enable the automation server on `port`.
pub fn automation_args(port: u16) -> Vec<String> {
    vec![
        "--automation".to_string(),
        "--automationPort".to_string(),
        port.to_string(),
    ]
}

/// Resolve the Logic 2 binary.
///
/// An explicit `application_path` must exist.  Without one, only Windows has
/// a well-known install location (`%ProgramW6432%\Logic\Logic.exe`).
pub fn find_application(application_path: Option<&Path>) -> Result<PathBuf> {
    match application_path {
        Some(path) => {
            if path.exists() {
                Ok(path.to_path_buf())
            } else {
                Err(SaleaeError::Launch(format!(
                    "application path \"{}\" does not exist",
                    path.display()
                )))
            }
        }
        None => default_application_path(),
    }
}

#[cfg(target_os = "windows")]
fn default_application_path() -> Result<PathBuf> {
    let program_files = std::env::var_os("ProgramW6432")
        .ok_or_else(|| SaleaeError::Launch("\"Program Files\" not found".to_string()))?;

    let logic2_bin = PathBuf::from(program_files).join("Logic").join("Logic.exe");
    if !logic2_bin.exists() {
        return Err(SaleaeError::Launch(
            "Logic2 install not found. Go to https://www.saleae.com/downloads/ to download the installer."
                .to_string(),
        ));
    }
    Ok(logic2_bin)
}

#[cfg(not(target_os = "windows"))]
fn default_application_path() -> Result<PathBuf> {
    Err(SaleaeError::Launch(format!(
        "launching Logic 2 is not supported on {} without an explicit application path",
        std::env::consts::OS
    )))
}

/// Spawn `logic2_bin` with the automation server enabled on `port`.
pub(crate) fn spawn(logic2_bin: &Path, port: u16) -> Result<Logic2Process> {
    debug!(path = %logic2_bin.display(), port, "Spawning Logic 2");

    let child = Command::new(logic2_bin)
        .args(automation_args(port))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let pid = child.id().ok_or_else(|| {
        SaleaeError::Launch(format!(
            "\"{}\" exited immediately after launch",
            logic2_bin.display()
        ))
    })?;

    info!(path = %logic2_bin.display(), pid, port, "Logic 2 launched");
    Ok(Logic2Process { child, pid })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
