/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Capture job files.
//!
//! A capture job describes one complete capture run: where Logic 2 is, which
//! device and channels to record, how the capture ends, which analyzers to
//! add and what to write out afterwards.
//!
//! The expected YAML structure is:
//! ```yaml
//! connection:
//!   address: 127.0.0.1
//!   port: 10430
//!   connect_timeout_seconds: 20
//! device_id: F4241
//! include_simulation_devices: true
//! device:
//!   enabled_digital_channels: [0, 1, 2, 3]
//!   digital_sample_rate: 10000000
//!   digital_threshold_volts: 3.3
//! capture:
//!   buffer_size_megabytes: 128
//!   capture_mode:
//!     timed:
//!       duration_seconds: 5.0
//! analyzers:
//!   - name: SPI
//!     label: spi
//!     settings:
//!       MISO: 0
//!       Clock: 1
//!       Enable: 2
//!       Bits per Transfer: "8 Bits per Transfer (Standard)"
//! output:
//!   directory: ./out
//!   raw_csv: true
//!   raw_binary: false
//!   data_table: spi_export.csv
//!   radix: ascii
//!   save_capture: example_capture.sal
//! ```
//!
//! Everything except `device` is optional.  A manual capture (the default
//! mode) also needs `manual_stop_after_seconds`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::capture::{AnalyzerSettingValue, RadixType};
use crate::manager::{ConnectOptions, DEFAULT_GRPC_ADDRESS, DEFAULT_GRPC_PORT};
use crate::models::{CaptureConfiguration, CaptureMode, LogicDeviceConfiguration};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.  Callers work with
/// [`CaptureJob`] instead.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureJobFile {
    #[serde(default)]
    connection: ConnectionEntry,
    device_id: Option<String>,
    #[serde(default)]
    include_simulation_devices: bool,
    device: LogicDeviceConfiguration,
    // `capture_mode: { timed: ... }` is a single-key map, not a YAML tag.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    capture: CaptureConfiguration,
    manual_stop_after_seconds: Option<f64>,
    #[serde(default)]
    analyzers: Vec<AnalyzerEntry>,
    #[serde(default)]
    output: OutputEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConnectionEntry {
    address: Option<String>,
    port: Option<u16>,
    connect_timeout_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnalyzerEntry {
    name: String,
    label: Option<String>,
    #[serde(default)]
    settings: BTreeMap<String, AnalyzerSettingValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputEntry {
    directory: Option<PathBuf>,
    #[serde(default)]
    raw_csv: bool,
    #[serde(default)]
    raw_binary: bool,
    data_table: Option<String>,
    radix: Option<RadixType>,
    save_capture: Option<String>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Where to find Logic 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub address: String,
    pub port: u16,
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_GRPC_ADDRESS.to_string(),
            port: DEFAULT_GRPC_PORT,
            connect_timeout: None,
        }
    }
}

impl From<&ConnectionConfig> for ConnectOptions {
    fn from(c: &ConnectionConfig) -> Self {
        ConnectOptions {
            address: c.address.clone(),
            port: c.port,
            connect_timeout: c.connect_timeout,
        }
    }
}

/// One protocol analyzer to add once recording has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Analyzer name as listed in Logic 2, e.g. `"SPI"`.
    pub name: String,
    pub label: Option<String>,
    pub settings: BTreeMap<String, AnalyzerSettingValue>,
}

/// What to write after the capture.  File names are relative to
/// `directory`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub raw_csv: bool,
    pub raw_binary: bool,
    pub data_table: Option<String>,
    pub radix: Option<RadixType>,
    pub save_capture: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            raw_csv: false,
            raw_binary: false,
            data_table: None,
            radix: None,
            save_capture: None,
        }
    }
}

impl OutputConfig {
    /// `true` if the job produces no files at all.
    pub fn is_empty(&self) -> bool {
        !self.raw_csv && !self.raw_binary && self.data_table.is_none() && self.save_capture.is_none()
    }
}

/// A validated capture job.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureJob {
    pub connection: ConnectionConfig,
    /// `None` lets Logic 2 pick the device.
    pub device_id: Option<String>,
    pub include_simulation_devices: bool,
    pub device: LogicDeviceConfiguration,
    pub capture: CaptureConfiguration,
    /// How long a manual capture records before it is stopped.
    pub manual_stop_after: Option<Duration>,
    pub analyzers: Vec<AnalyzerConfig>,
    pub output: OutputConfig,
}

impl CaptureJob {
    /// Parse and validate the job file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or the job fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading capture job from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open capture job file: {}", path.display()))?;

        let job = Self::from_yaml(&content)
            .with_context(|| format!("Invalid capture job file: {}", path.display()))?;

        info!(
            device_id = ?job.device_id,
            digital_channels = ?job.device.enabled_digital_channels,
            analog_channels = ?job.device.enabled_analog_channels,
            analyzers = job.analyzers.len(),
            output = %job.output.directory.display(),
            "Capture job loaded"
        );
        Ok(job)
    }

    /// Parse and validate a job from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: CaptureJobFile =
            serde_yaml::from_str(content).context("Failed to parse capture job YAML")?;

        let connect_timeout = file
            .connection
            .connect_timeout_seconds
            .map(|s| seconds_to_duration("connection.connect_timeout_seconds", s))
            .transpose()?;

        let manual_stop_after = file
            .manual_stop_after_seconds
            .map(|s| seconds_to_duration("manual_stop_after_seconds", s))
            .transpose()?;

        let job = CaptureJob {
            connection: ConnectionConfig {
                address: file
                    .connection
                    .address
                    .unwrap_or_else(|| DEFAULT_GRPC_ADDRESS.to_string()),
                port: file.connection.port.unwrap_or(DEFAULT_GRPC_PORT),
                connect_timeout,
            },
            device_id: file.device_id.filter(|id| !id.is_empty()),
            include_simulation_devices: file.include_simulation_devices,
            device: file.device,
            capture: file.capture,
            manual_stop_after,
            analyzers: file
                .analyzers
                .into_iter()
                .map(|a| AnalyzerConfig {
                    name: a.name,
                    label: a.label,
                    settings: a.settings,
                })
                .collect(),
            output: OutputConfig {
                directory: file.output.directory.unwrap_or_else(|| PathBuf::from(".")),
                raw_csv: file.output.raw_csv,
                raw_binary: file.output.raw_binary,
                data_table: file.output.data_table,
                radix: file.output.radix,
                save_capture: file.output.save_capture,
            },
        };

        for analyzer in &job.analyzers {
            debug!(
                "  Analyzer: {} | label: {:?} | settings: {}",
                analyzer.name,
                analyzer.label,
                analyzer.settings.len()
            );
        }

        job.validate()?;
        Ok(job)
    }

    /// Reject jobs that cannot run to completion.
    ///
    /// * at least one analog or digital channel must be enabled
    /// * a manual capture needs `manual_stop_after_seconds`
    /// * a timed capture needs a positive duration
    /// * a data table export needs at least one analyzer
    pub fn validate(&self) -> Result<()> {
        if self.device.has_no_channels() {
            bail!("device: at least one analog or digital channel must be enabled");
        }

        match &self.capture.capture_mode {
            CaptureMode::Manual(_) => {
                if self.manual_stop_after.is_none() {
                    bail!("manual capture mode requires manual_stop_after_seconds");
                }
            }
            CaptureMode::Timed(timed) => {
                if timed.duration_seconds.is_nan() || timed.duration_seconds <= 0.0 {
                    bail!(
                        "timed capture mode: duration_seconds must be positive, got {}",
                        timed.duration_seconds
                    );
                }
            }
            CaptureMode::DigitalTrigger(trigger) => {
                let has_pulse_width = trigger.min_pulse_width_seconds.is_some()
                    || trigger.max_pulse_width_seconds.is_some();
                if has_pulse_width && !trigger.trigger_type.is_pulse() {
                    warn!(
                        trigger_type = ?trigger.trigger_type,
                        "Pulse width limits are ignored for edge triggers"
                    );
                }
                if !self
                    .device
                    .enabled_digital_channels
                    .contains(&trigger.trigger_channel_index)
                {
                    bail!(
                        "digital trigger channel {} is not an enabled digital channel",
                        trigger.trigger_channel_index
                    );
                }
            }
        }

        if self.manual_stop_after.is_some() && !self.capture.capture_mode.is_manual() {
            warn!("manual_stop_after_seconds is ignored outside manual capture mode");
        }

        if self.output.data_table.is_some() && self.analyzers.is_empty() {
            bail!("output.data_table requires at least one analyzer");
        }

        if self.output.radix.is_some() && self.output.data_table.is_none() {
            warn!("output.radix is only used by the data table export");
        }

        Ok(())
    }
}

fn seconds_to_duration(field: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("{field}: {seconds} is not a valid number of seconds"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DigitalTriggerType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const FULL_JOB: &str = r#"
connection:
  address: 10.0.0.5
  port: 10500
  connect_timeout_seconds: 5
device_id: F4241
include_simulation_devices: true
device:
  enabled_digital_channels: [0, 1, 2, 3]
  digital_sample_rate: 10000000
  digital_threshold_volts: 3.3
capture:
  buffer_size_megabytes: 128
  capture_mode:
    timed:
      duration_seconds: 5.0
analyzers:
  - name: SPI
    label: spi
    settings:
      MISO: 0
      Clock: 1
      Enable: 2
      Bits per Transfer: "8 Bits per Transfer (Standard)"
output:
  directory: ./out
  raw_csv: true
  data_table: spi_export.csv
  radix: ascii
  save_capture: example_capture.sal
"#;

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_job() {
        let f = yaml_tempfile(FULL_JOB);
        let job = CaptureJob::load_from_file(f.path()).unwrap();

        assert_eq!(job.connection.address, "10.0.0.5");
        assert_eq!(job.connection.port, 10500);
        assert_eq!(job.connection.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(job.device_id.as_deref(), Some("F4241"));
        assert!(job.include_simulation_devices);
        assert_eq!(job.device.enabled_digital_channels, vec![0, 1, 2, 3]);
        assert_eq!(job.device.digital_sample_rate, Some(10_000_000));
        assert_eq!(job.capture.buffer_size_megabytes, Some(128));
        assert!(matches!(job.capture.capture_mode, CaptureMode::Timed(ref t) if t.duration_seconds == 5.0));

        assert_eq!(job.analyzers.len(), 1);
        let spi = &job.analyzers[0];
        assert_eq!(spi.name, "SPI");
        assert_eq!(spi.label.as_deref(), Some("spi"));
        assert_eq!(spi.settings["Clock"], AnalyzerSettingValue::Int(1));
        assert_eq!(
            spi.settings["Bits per Transfer"],
            AnalyzerSettingValue::String("8 Bits per Transfer (Standard)".to_string())
        );

        assert_eq!(job.output.directory, PathBuf::from("./out"));
        assert!(job.output.raw_csv);
        assert!(!job.output.raw_binary);
        assert_eq!(job.output.data_table.as_deref(), Some("spi_export.csv"));
        assert_eq!(job.output.radix, Some(RadixType::Ascii));
        assert_eq!(job.output.save_capture.as_deref(), Some("example_capture.sal"));
    }

    #[test]
    fn minimal_job_uses_defaults() {
        let yaml = r#"
device:
  enabled_digital_channels: [0]
manual_stop_after_seconds: 0.5
"#;
        let job = CaptureJob::from_yaml(yaml).unwrap();
        assert_eq!(job.connection, ConnectionConfig::default());
        assert!(job.device_id.is_none());
        assert!(!job.include_simulation_devices);
        assert!(job.capture.capture_mode.is_manual());
        assert_eq!(job.manual_stop_after, Some(Duration::from_millis(500)));
        assert!(job.analyzers.is_empty());
        assert!(job.output.is_empty());
        assert_eq!(job.output.directory, PathBuf::from("."));
    }

    #[test]
    fn empty_device_id_means_any_device() {
        let yaml = "device_id: \"\"\ndevice:\n  enabled_digital_channels: [0]\nmanual_stop_after_seconds: 1\n";
        assert!(CaptureJob::from_yaml(yaml).unwrap().device_id.is_none());
    }

    #[test]
    fn trigger_job_parses() {
        let yaml = r#"
device:
  enabled_digital_channels: [0, 1]
capture:
  capture_mode:
    digital_trigger:
      trigger_type: pulse_high
      trigger_channel_index: 1
      min_pulse_width_seconds: 0.000001
      linked_channels:
        - { channel_index: 0, state: low }
"#;
        let job = CaptureJob::from_yaml(yaml).unwrap();
        match job.capture.capture_mode {
            CaptureMode::DigitalTrigger(t) => {
                assert_eq!(t.trigger_type, DigitalTriggerType::PulseHigh);
                assert_eq!(t.trigger_channel_index, 1);
                assert_eq!(t.linked_channels.len(), 1);
            }
            other => panic!("unexpected capture mode: {other:?}"),
        }
    }

    #[test]
    fn capture_modes_parse_from_single_key_maps() {
        let timed = "device:\n  enabled_digital_channels: [0]\ncapture:\n  capture_mode:\n    timed:\n      duration_seconds: 1.0\n      trim_data_seconds: 0.5\n";
        let job = CaptureJob::from_yaml(timed).unwrap();
        match job.capture.capture_mode {
            CaptureMode::Timed(t) => {
                assert_eq!(t.duration_seconds, 1.0);
                assert_eq!(t.trim_data_seconds, Some(0.5));
            }
            other => panic!("unexpected capture mode: {other:?}"),
        }

        let manual = "device:\n  enabled_digital_channels: [0]\ncapture:\n  capture_mode:\n    manual: {}\nmanual_stop_after_seconds: 1\n";
        let job = CaptureJob::from_yaml(manual).unwrap();
        assert!(job.capture.capture_mode.is_manual());
        assert_eq!(job.capture.buffer_size_megabytes, None);
    }

    #[test]
    fn connection_converts_to_connect_options() {
        let job = CaptureJob::from_yaml(FULL_JOB).unwrap();
        let opts = ConnectOptions::from(&job.connection);
        assert_eq!(opts.endpoint_uri(), "http://10.0.0.5:10500");
        assert_eq!(opts.connect_timeout, Some(Duration::from_secs(5)));
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_error() {
        let result = CaptureJob::load_from_file(Path::new("/nonexistent/path/job.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(CaptureJob::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_device_section_is_rejected() {
        assert!(CaptureJob::from_yaml("manual_stop_after_seconds: 1\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "device:\n  enabled_digital_channels: [0]\nmanual_stop_after_seconds: 1\nsample_rate: 5\n";
        assert!(CaptureJob::from_yaml(yaml).is_err());
    }

    #[test]
    fn misspelled_nested_keys_are_rejected() {
        let cases = [
            (
                "device:\n  enabled_digital_channels: [0]\n  digital_sample_rat: 500000000\nmanual_stop_after_seconds: 1\n",
                "digital_sample_rat",
            ),
            (
                "device:\n  enabled_digital_channels: [0]\n  glitch_filters:\n    - { channel_index: 0, pulse_width: 0.001 }\nmanual_stop_after_seconds: 1\n",
                "pulse_width",
            ),
            (
                "device:\n  enabled_digital_channels: [0]\ncapture:\n  buffer_size_megabyte: 64\nmanual_stop_after_seconds: 1\n",
                "buffer_size_megabyte",
            ),
            (
                "device:\n  enabled_digital_channels: [0]\ncapture:\n  capture_mode:\n    timed:\n      duration_seconds: 1.0\n      trim_data_second: 0.5\n",
                "trim_data_second",
            ),
            (
                "device:\n  enabled_digital_channels: [0]\ncapture:\n  capture_mode:\n    manual:\n      trim_data_second: 0.5\nmanual_stop_after_seconds: 1\n",
                "trim_data_second",
            ),
            (
                "device:\n  enabled_digital_channels: [0, 1]\ncapture:\n  capture_mode:\n    digital_trigger:\n      trigger_type: rising\n      trigger_channel_index: 0\n      after_trigger_second: 1\n",
                "after_trigger_second",
            ),
        ];
        for (yaml, key) in cases {
            let err = CaptureJob::from_yaml(yaml).unwrap_err();
            assert!(format!("{err:#}").contains(key), "{key}: {err:#}");
        }
    }

    #[test]
    fn no_channels_is_rejected() {
        let err = CaptureJob::from_yaml("device: {}\nmanual_stop_after_seconds: 1\n").unwrap_err();
        assert!(format!("{err:#}").contains("at least one analog or digital channel"));
    }

    #[test]
    fn manual_mode_requires_stop_time() {
        let err = CaptureJob::from_yaml("device:\n  enabled_digital_channels: [0]\n").unwrap_err();
        assert!(format!("{err:#}").contains("manual_stop_after_seconds"));
    }

    #[test]
    fn negative_stop_time_is_rejected() {
        let yaml = "device:\n  enabled_digital_channels: [0]\nmanual_stop_after_seconds: -1\n";
        assert!(CaptureJob::from_yaml(yaml).is_err());
    }

    #[test]
    fn timed_mode_requires_positive_duration() {
        let yaml = r#"
device:
  enabled_digital_channels: [0]
capture:
  capture_mode:
    timed:
      duration_seconds: 0
"#;
        let err = CaptureJob::from_yaml(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("duration_seconds must be positive"));
    }

    #[test]
    fn trigger_channel_must_be_enabled() {
        let yaml = r#"
device:
  enabled_digital_channels: [0, 1]
capture:
  capture_mode:
    digital_trigger:
      trigger_type: rising
      trigger_channel_index: 7
"#;
        let err = CaptureJob::from_yaml(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("channel 7"));
    }

    #[test]
    fn data_table_requires_analyzers() {
        let yaml = r#"
device:
  enabled_digital_channels: [0]
manual_stop_after_seconds: 1
output:
  data_table: table.csv
"#;
        let err = CaptureJob::from_yaml(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("requires at least one analyzer"));
    }
}
