/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runs a [`CaptureJob`] against a connected [`Manager`].
//!
//! ```text
//! list devices ─► start_capture ─► wait / (sleep + stop) ─► add analyzers
//!     ─► raw csv ─► raw binary ─► data table ─► save ─► close
//! ```
//!
//! The capture is closed even when a later step fails, so a failed job never
//! leaves a tab open in Logic 2.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::capture::{
    AnalyzerHandle, Capture, DataTableExportConfiguration, DataTableExportOptions,
    RawDataExportOptions,
};
use crate::config::CaptureJob;
use crate::errors::Result;
use crate::manager::Manager;
use crate::models::{CaptureMode, DeviceConfiguration};

/// What a finished job produced.  Paths are absolute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReport {
    pub capture_id: u64,
    /// `(name, handle)` for every analyzer added, in job order.
    pub analyzers: Vec<(String, AnalyzerHandle)>,
    pub raw_csv_directory: Option<PathBuf>,
    pub raw_binary_directory: Option<PathBuf>,
    pub data_table: Option<PathBuf>,
    pub saved_capture: Option<PathBuf>,
}

/// Run `job` to completion.
///
/// # Errors
/// * [`SaleaeError::MissingDevice`] if Logic 2 has no device `job.device_id`.
/// * [`SaleaeError::Io`] if the output directory cannot be created.
/// * Any error returned by Logic 2 while capturing or exporting.
pub async fn run_job(manager: &Manager, job: &CaptureJob) -> Result<JobReport> {
    // Listing is informational only; Logic 2 owns the MISSING_DEVICE decision.
    if let Some(device_id) = &job.device_id {
        let devices = manager.get_devices(job.include_simulation_devices).await?;
        if !devices.iter().any(|d| &d.device_id == device_id) {
            warn!(
                device_id = %device_id,
                listed = devices.len(),
                include_simulation_devices = job.include_simulation_devices,
                "Device not in the device list, starting capture anyway"
            );
        }
    }

    let output_dir = absolute(&job.output.directory)?;
    if !job.output.is_empty() {
        std::fs::create_dir_all(&output_dir)?;
    }

    let device_configuration = DeviceConfiguration::from(job.device.clone());
    let mut capture = manager
        .start_capture(
            &device_configuration,
            job.device_id.as_deref(),
            Some(&job.capture),
        )
        .await?;

    let result = run_started(&mut capture, job, &output_dir).await;

    // Close regardless; a close failure only wins if the job itself succeeded.
    let capture_id = capture.id();
    match (result, capture.close().await) {
        (Ok(report), Ok(())) => {
            info!(capture_id, "Capture job finished");
            Ok(report)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), close_result) => {
            if let Err(close_err) = close_result {
                warn!(capture_id, error = %close_err, "Failed to close capture after job failure");
            }
            Err(e)
        }
    }
}

async fn run_started(capture: &mut Capture, job: &CaptureJob, output_dir: &Path) -> Result<JobReport> {
    let mut report = JobReport {
        capture_id: capture.id(),
        ..Default::default()
    };

    match &job.capture.capture_mode {
        CaptureMode::Manual(_) => {
            let stop_after = job.manual_stop_after.unwrap_or_default();
            info!(
                capture_id = capture.id(),
                seconds = stop_after.as_secs_f64(),
                "Recording (manual mode)"
            );
            tokio::time::sleep(stop_after).await;
            capture.stop().await?;
        }
        CaptureMode::Timed(_) | CaptureMode::DigitalTrigger(_) => {
            info!(capture_id = capture.id(), "Waiting for capture to complete");
            capture.wait().await?;
        }
    }

    for analyzer in &job.analyzers {
        let handle = capture
            .add_analyzer(
                &analyzer.name,
                analyzer.label.as_deref(),
                analyzer.settings.iter().map(|(k, v)| (k.clone(), v.clone())),
            )
            .await?;
        report.analyzers.push((analyzer.name.clone(), handle));
    }

    let raw_options = || RawDataExportOptions {
        analog_channels: job.device.enabled_analog_channels.clone(),
        digital_channels: job.device.enabled_digital_channels.clone(),
        ..Default::default()
    };

    if job.output.raw_csv {
        capture
            .export_raw_data_csv(&path_str(output_dir), raw_options())
            .await?;
        report.raw_csv_directory = Some(output_dir.to_path_buf());
    }

    if job.output.raw_binary {
        capture
            .export_raw_data_binary(&path_str(output_dir), raw_options())
            .await?;
        report.raw_binary_directory = Some(output_dir.to_path_buf());
    }

    if let Some(name) = &job.output.data_table {
        let filepath = output_dir.join(name);
        let analyzers: Vec<DataTableExportConfiguration> = report
            .analyzers
            .iter()
            .map(|(_, handle)| DataTableExportConfiguration {
                analyzer: *handle,
                radix: job.output.radix,
            })
            .collect();
        capture
            .export_data_table(&path_str(&filepath), &analyzers, DataTableExportOptions::default())
            .await?;
        report.data_table = Some(filepath);
    }

    if let Some(name) = &job.output.save_capture {
        let filepath = output_dir.join(name);
        capture.save_capture(&path_str(&filepath)).await?;
        report.saved_capture = Some(filepath);
    }

    Ok(report)
}

/// Logic 2 resolves relative paths against its own working directory, so
/// every path sent to it is made absolute first.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_keeps_absolute_paths() {
        let p = Path::new("/tmp/out");
        assert_eq!(absolute(p).unwrap(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn absolute_joins_relative_paths_onto_cwd() {
        let p = absolute(Path::new("out")).unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("out"));
    }
}
