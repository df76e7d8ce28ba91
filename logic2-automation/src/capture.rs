/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A single capture (tab) inside Logic 2.
//!
//! A [`Capture`] is returned by `Manager::start_capture()` and
//! `Manager::load_capture()`.  A started capture is still recording: call
//! either [`Capture::wait`] (timed / trigger modes) or [`Capture::stop`]
//! (manual mode) before adding analyzers, exporting or saving.
//!
//! Always finish with [`Capture::close`].  Captures left open stay in Logic 2
//! as tabs and keep consuming memory.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tonic::transport::Channel;
use tracing::{debug, info, warn};

use crate::errors::{Result, SaleaeError};
use crate::proto::saleae_automation as pb;
use crate::proto::saleae_automation::manager_client::ManagerClient;
use crate::proto::saleae_automation::{analyzer_setting_value, high_level_analyzer_setting_value};

// ── Analyzer types ────────────────────────────────────────────────────────────

/// Display radix for analyzer exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadixType {
    Binary,
    Decimal,
    Hexadecimal,
    Ascii,
}

impl RadixType {
    pub fn to_proto(self) -> pb::RadixType {
        match self {
            RadixType::Binary => pb::RadixType::Binary,
            RadixType::Decimal => pb::RadixType::Decimal,
            RadixType::Hexadecimal => pb::RadixType::Hexadecimal,
            RadixType::Ascii => pb::RadixType::Ascii,
        }
    }
}

/// Handle to an analyzer or high level analyzer added to a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyzerHandle {
    pub analyzer_id: u64,
}

/// Value of one analyzer setting.
///
/// Keys and values must match the analyzer settings shown in the Logic 2 UI
/// exactly, e.g. `"Bits per Transfer" => "8 Bits per Transfer (Standard)"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzerSettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&AnalyzerSettingValue> for pb::AnalyzerSettingValue {
    fn from(v: &AnalyzerSettingValue) -> Self {
        let value = match v {
            AnalyzerSettingValue::String(s) => analyzer_setting_value::Value::StringValue(s.clone()),
            AnalyzerSettingValue::Int(i) => analyzer_setting_value::Value::Int64Value(*i),
            AnalyzerSettingValue::Bool(b) => analyzer_setting_value::Value::BoolValue(*b),
            AnalyzerSettingValue::Float(f) => analyzer_setting_value::Value::DoubleValue(*f),
        };
        Self { value: Some(value) }
    }
}

impl From<&str> for AnalyzerSettingValue {
    fn from(v: &str) -> Self {
        AnalyzerSettingValue::String(v.to_string())
    }
}

impl From<String> for AnalyzerSettingValue {
    fn from(v: String) -> Self {
        AnalyzerSettingValue::String(v)
    }
}

impl From<i64> for AnalyzerSettingValue {
    fn from(v: i64) -> Self {
        AnalyzerSettingValue::Int(v)
    }
}

impl From<i32> for AnalyzerSettingValue {
    fn from(v: i32) -> Self {
        AnalyzerSettingValue::Int(i64::from(v))
    }
}

impl From<u32> for AnalyzerSettingValue {
    fn from(v: u32) -> Self {
        AnalyzerSettingValue::Int(i64::from(v))
    }
}

impl From<bool> for AnalyzerSettingValue {
    fn from(v: bool) -> Self {
        AnalyzerSettingValue::Bool(v)
    }
}

impl From<f64> for AnalyzerSettingValue {
    fn from(v: f64) -> Self {
        AnalyzerSettingValue::Float(v)
    }
}

/// Value of one high level analyzer setting.  HLAs only know strings and
/// numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HighLevelAnalyzerSettingValue {
    Number(f64),
    String(String),
}

impl From<&HighLevelAnalyzerSettingValue> for pb::HighLevelAnalyzerSettingValue {
    fn from(v: &HighLevelAnalyzerSettingValue) -> Self {
        let value = match v {
            HighLevelAnalyzerSettingValue::String(s) => {
                high_level_analyzer_setting_value::Value::StringValue(s.clone())
            }
            HighLevelAnalyzerSettingValue::Number(n) => {
                high_level_analyzer_setting_value::Value::NumberValue(*n)
            }
        };
        Self { value: Some(value) }
    }
}

impl From<&str> for HighLevelAnalyzerSettingValue {
    fn from(v: &str) -> Self {
        HighLevelAnalyzerSettingValue::String(v.to_string())
    }
}

impl From<String> for HighLevelAnalyzerSettingValue {
    fn from(v: String) -> Self {
        HighLevelAnalyzerSettingValue::String(v)
    }
}

impl From<f64> for HighLevelAnalyzerSettingValue {
    fn from(v: f64) -> Self {
        HighLevelAnalyzerSettingValue::Number(v)
    }
}

impl From<i64> for HighLevelAnalyzerSettingValue {
    fn from(v: i64) -> Self {
        HighLevelAnalyzerSettingValue::Number(v as f64)
    }
}

// ── Export options ────────────────────────────────────────────────────────────

/// One analyzer to include in a data table export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTableExportConfiguration {
    pub analyzer: AnalyzerHandle,
    /// `None` leaves the radix to Logic 2.
    pub radix: Option<RadixType>,
}

impl From<AnalyzerHandle> for DataTableExportConfiguration {
    fn from(analyzer: AnalyzerHandle) -> Self {
        Self {
            analyzer,
            radix: None,
        }
    }
}

impl From<&DataTableExportConfiguration> for pb::DataTableAnalyzerConfiguration {
    fn from(cfg: &DataTableExportConfiguration) -> Self {
        let mut out = pb::DataTableAnalyzerConfiguration {
            analyzer_id: cfg.analyzer.analyzer_id,
            ..Default::default()
        };
        if let Some(radix) = cfg.radix {
            out.set_radix_type(radix.to_proto());
        }
        out
    }
}

/// Query applied to the data table before export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataTableFilter {
    /// Columns to search.
    pub columns: Vec<String>,
    pub query: String,
}

/// Options for [`Capture::export_data_table`].
#[derive(Debug, Clone, Default)]
pub struct DataTableExportOptions {
    /// Columns to include.  `None` exports every column.
    pub columns: Option<Vec<String>>,
    pub filter: Option<DataTableFilter>,
    /// Wall clock timestamps instead of capture-relative ones.
    pub iso8601_timestamp: bool,
}

/// Options for [`Capture::export_raw_data_csv`] and
/// [`Capture::export_raw_data_binary`].
///
/// Leaving both channel lists empty exports every channel.
#[derive(Debug, Clone)]
pub struct RawDataExportOptions {
    pub analog_channels: Vec<u32>,
    pub digital_channels: Vec<u32>,
    /// Keep every Nth analog sample.  Must be at least 1.
    pub analog_downsample_ratio: u64,
    /// CSV only: wall clock timestamps instead of capture-relative ones.
    pub iso8601_timestamp: bool,
}

impl Default for RawDataExportOptions {
    fn default() -> Self {
        Self {
            analog_channels: Vec::new(),
            digital_channels: Vec::new(),
            analog_downsample_ratio: 1,
            iso8601_timestamp: false,
        }
    }
}

impl RawDataExportOptions {
    fn logic_channels(&self) -> pb::LogicChannels {
        pb::LogicChannels {
            analog_channels: self.analog_channels.clone(),
            digital_channels: self.digital_channels.clone(),
        }
    }
}

// ── Capture ───────────────────────────────────────────────────────────────────

/// A capture inside the connected Logic 2 instance.
pub struct Capture {
    client: ManagerClient<Channel>,
    capture_id: u64,
    /// `true` from `start_capture()` until `stop()`/`wait()` succeeds.
    running: bool,
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture")
            .field("capture_id", &self.capture_id)
            .field("running", &self.running)
            .finish()
    }
}

impl Capture {
    pub(crate) fn new(client: ManagerClient<Channel>, capture_id: u64, running: bool) -> Self {
        Self {
            client,
            capture_id,
            running,
        }
    }

    /// Id Logic 2 assigned to this capture.
    pub fn id(&self) -> u64 {
        self.capture_id
    }

    /// `true` while a started capture has not yet been stopped or waited on.
    /// Always `false` for loaded captures.
    pub fn is_running(&self) -> bool {
        self.running
    }

    // ── Analyzers ─────────────────────────────────────────────────────────────

    /// Add a protocol analyzer.
    ///
    /// `name` must match the analyzer list in Logic 2 exactly (e.g. `"SPI"`,
    /// `"Async Serial"`).  `label` is the display name used in data table
    /// exports.
    pub async fn add_analyzer<I, K, V>(
        &self,
        name: &str,
        label: Option<&str>,
        settings: I,
    ) -> Result<AnalyzerHandle>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AnalyzerSettingValue>,
    {
        let settings: HashMap<String, pb::AnalyzerSettingValue> = settings
            .into_iter()
            .map(|(k, v)| {
                let value: AnalyzerSettingValue = v.into();
                (k.into(), pb::AnalyzerSettingValue::from(&value))
            })
            .collect();

        debug!(
            capture_id = self.capture_id,
            analyzer = name,
            setting_count = settings.len(),
            "Adding analyzer"
        );

        let request = pb::AddAnalyzerRequest {
            capture_id: self.capture_id,
            analyzer_name: name.to_string(),
            analyzer_label: label.unwrap_or_default().to_string(),
            settings,
        };

        let reply = self
            .client
            .clone()
            .add_analyzer(request)
            .await
            .map_err(SaleaeError::from_status)?
            .into_inner();

        info!(
            capture_id = self.capture_id,
            analyzer = name,
            analyzer_id = reply.analyzer_id,
            "Analyzer added"
        );
        Ok(AnalyzerHandle {
            analyzer_id: reply.analyzer_id,
        })
    }

    /// Add a high level analyzer from the extension in `extension_directory`,
    /// fed by `input_analyzer`.
    pub async fn add_high_level_analyzer<I, K, V>(
        &self,
        extension_directory: &str,
        name: &str,
        input_analyzer: AnalyzerHandle,
        settings: I,
        label: Option<&str>,
    ) -> Result<AnalyzerHandle>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HighLevelAnalyzerSettingValue>,
    {
        let settings: HashMap<String, pb::HighLevelAnalyzerSettingValue> = settings
            .into_iter()
            .map(|(k, v)| {
                let value: HighLevelAnalyzerSettingValue = v.into();
                (k.into(), pb::HighLevelAnalyzerSettingValue::from(&value))
            })
            .collect();

        let request = pb::AddHighLevelAnalyzerRequest {
            capture_id: self.capture_id,
            extension_directory: extension_directory.to_string(),
            hla_name: name.to_string(),
            hla_label: label.unwrap_or_default().to_string(),
            input_analyzer_id: input_analyzer.analyzer_id,
            settings,
        };

        let reply = self
            .client
            .clone()
            .add_high_level_analyzer(request)
            .await
            .map_err(SaleaeError::from_status)?
            .into_inner();

        info!(
            capture_id = self.capture_id,
            hla = name,
            analyzer_id = reply.analyzer_id,
            input_analyzer_id = input_analyzer.analyzer_id,
            "High level analyzer added"
        );
        Ok(AnalyzerHandle {
            analyzer_id: reply.analyzer_id,
        })
    }

    pub async fn remove_analyzer(&self, analyzer: AnalyzerHandle) -> Result<()> {
        let request = pb::RemoveAnalyzerRequest {
            capture_id: self.capture_id,
            analyzer_id: analyzer.analyzer_id,
        };
        self.client
            .clone()
            .remove_analyzer(request)
            .await
            .map_err(SaleaeError::from_status)?;
        debug!(capture_id = self.capture_id, analyzer_id = analyzer.analyzer_id, "Analyzer removed");
        Ok(())
    }

    pub async fn remove_high_level_analyzer(&self, analyzer: AnalyzerHandle) -> Result<()> {
        let request = pb::RemoveHighLevelAnalyzerRequest {
            capture_id: self.capture_id,
            analyzer_id: analyzer.analyzer_id,
        };
        self.client
            .clone()
            .remove_high_level_analyzer(request)
            .await
            .map_err(SaleaeError::from_status)?;
        debug!(
            capture_id = self.capture_id,
            analyzer_id = analyzer.analyzer_id,
            "High level analyzer removed"
        );
        Ok(())
    }

    // ── Save / export ─────────────────────────────────────────────────────────

    /// Save to a `.sal` file.  Relative paths resolve against the Logic 2
    /// working directory.
    pub async fn save_capture(&self, filepath: &str) -> Result<()> {
        let request = pb::SaveCaptureRequest {
            capture_id: self.capture_id,
            filepath: filepath.to_string(),
        };
        self.client
            .clone()
            .save_capture(request)
            .await
            .map_err(SaleaeError::from_status)?;
        info!(capture_id = self.capture_id, filepath, "Capture saved");
        Ok(())
    }

    /// Export one analyzer in the analyzer plugin's own export format.
    ///
    /// Prefer [`export_data_table`](Self::export_data_table) for the data
    /// table format.
    pub async fn legacy_export_analyzer(
        &self,
        filepath: &str,
        analyzer: AnalyzerHandle,
        radix: RadixType,
    ) -> Result<()> {
        let mut request = pb::LegacyExportAnalyzerRequest {
            capture_id: self.capture_id,
            filepath: filepath.to_string(),
            analyzer_id: analyzer.analyzer_id,
            ..Default::default()
        };
        request.set_radix_type(radix.to_proto());

        self.client
            .clone()
            .legacy_export_analyzer(request)
            .await
            .map_err(SaleaeError::from_status)?;
        info!(capture_id = self.capture_id, filepath, "Legacy analyzer export written");
        Ok(())
    }

    /// Export the analyzer data table to a CSV file.
    pub async fn export_data_table<A>(
        &self,
        filepath: &str,
        analyzers: &[A],
        options: DataTableExportOptions,
    ) -> Result<()>
    where
        A: Into<DataTableExportConfiguration> + Copy,
    {
        let analyzers: Vec<pb::DataTableAnalyzerConfiguration> = analyzers
            .iter()
            .map(|a| {
                let cfg: DataTableExportConfiguration = (*a).into();
                pb::DataTableAnalyzerConfiguration::from(&cfg)
            })
            .collect();

        if analyzers.is_empty() {
            warn!(capture_id = self.capture_id, "Data table export with no analyzers");
        }

        let request = pb::ExportDataTableCsvRequest {
            capture_id: self.capture_id,
            filepath: filepath.to_string(),
            analyzers,
            iso8601_timestamp: options.iso8601_timestamp,
            export_columns: options.columns.unwrap_or_default(),
            filter: options.filter.map(|f| pb::DataTableFilter {
                query: f.query,
                columns: f.columns,
            }),
        };

        self.client
            .clone()
            .export_data_table_csv(request)
            .await
            .map_err(SaleaeError::from_status)?;
        info!(capture_id = self.capture_id, filepath, "Data table exported");
        Ok(())
    }

    /// Export raw samples as CSV into `directory`, which must already exist.
    ///
    /// Produces `analog.csv` and/or `digital.csv`, the same files as the
    /// "Export Raw Data" dialog.
    pub async fn export_raw_data_csv(
        &self,
        directory: &str,
        options: RawDataExportOptions,
    ) -> Result<()> {
        let request = pb::ExportRawDataCsvRequest {
            capture_id: self.capture_id,
            directory: directory.to_string(),
            logic_channels: Some(options.logic_channels()),
            analog_downsample_ratio: options.analog_downsample_ratio,
            iso8601_timestamp: options.iso8601_timestamp,
        };

        self.client
            .clone()
            .export_raw_data_csv(request)
            .await
            .map_err(SaleaeError::from_status)?;
        info!(capture_id = self.capture_id, directory, "Raw data exported (csv)");
        Ok(())
    }

    /// Export raw samples in the binary format, one `.bin` file per channel,
    /// into `directory`, which must already exist.
    ///
    /// `options.iso8601_timestamp` does not apply to binary exports.
    pub async fn export_raw_data_binary(
        &self,
        directory: &str,
        options: RawDataExportOptions,
    ) -> Result<()> {
        let request = pb::ExportRawDataBinaryRequest {
            capture_id: self.capture_id,
            directory: directory.to_string(),
            logic_channels: Some(options.logic_channels()),
            analog_downsample_ratio: options.analog_downsample_ratio,
        };

        self.client
            .clone()
            .export_raw_data_binary(request)
            .await
            .map_err(SaleaeError::from_status)?;
        info!(capture_id = self.capture_id, directory, "Raw data exported (binary)");
        Ok(())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Stop recording.  Intended for manual mode but valid in any mode.
    ///
    /// Call either `stop()` or `wait()`, once, and never on a loaded capture.
    /// A capture failure that happened while recording is returned here.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.running {
            warn!(capture_id = self.capture_id, "stop() on a capture that is not recording");
        }
        let request = pb::StopCaptureRequest {
            capture_id: self.capture_id,
        };
        self.client
            .clone()
            .stop_capture(request)
            .await
            .map_err(SaleaeError::from_status)?;
        self.running = false;
        info!(capture_id = self.capture_id, "Capture stopped");
        Ok(())
    }

    /// Block until a timed or triggered capture has finished recording.
    ///
    /// Fails with [`SaleaeError::InvalidRequest`] for manual captures.
    pub async fn wait(&mut self) -> Result<()> {
        if !self.running {
            warn!(capture_id = self.capture_id, "wait() on a capture that is not recording");
        }
        let request = pb::WaitCaptureRequest {
            capture_id: self.capture_id,
        };
        self.client
            .clone()
            .wait_capture(request)
            .await
            .map_err(SaleaeError::from_status)?;
        self.running = false;
        info!(capture_id = self.capture_id, "Capture completed");
        Ok(())
    }

    /// Close the capture tab in Logic 2.
    pub async fn close(self) -> Result<()> {
        let request = pb::CloseCaptureRequest {
            capture_id: self.capture_id,
        };
        self.client
            .clone()
            .close_capture(request)
            .await
            .map_err(SaleaeError::from_status)?;
        debug!(capture_id = self.capture_id, "Capture closed");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_setting_values_map_to_oneof() {
        let v = pb::AnalyzerSettingValue::from(&AnalyzerSettingValue::from(true));
        assert_eq!(v.value, Some(analyzer_setting_value::Value::BoolValue(true)));

        let v = pb::AnalyzerSettingValue::from(&AnalyzerSettingValue::from(115_200_i64));
        assert_eq!(v.value, Some(analyzer_setting_value::Value::Int64Value(115_200)));

        let v = pb::AnalyzerSettingValue::from(&AnalyzerSettingValue::from(0.5));
        assert_eq!(v.value, Some(analyzer_setting_value::Value::DoubleValue(0.5)));

        let v = pb::AnalyzerSettingValue::from(&AnalyzerSettingValue::from("16 Bits per Transfer"));
        assert_eq!(
            v.value,
            Some(analyzer_setting_value::Value::StringValue(
                "16 Bits per Transfer".to_string()
            ))
        );
    }

    #[test]
    fn analyzer_setting_yaml_keeps_bool_and_int_distinct() {
        let settings: HashMap<String, AnalyzerSettingValue> =
            serde_yaml::from_str("Inverted: true\nMISO: 4\nRate: 0.5\nMode: \"8 Bits\"\n").unwrap();
        assert_eq!(settings["Inverted"], AnalyzerSettingValue::Bool(true));
        assert_eq!(settings["MISO"], AnalyzerSettingValue::Int(4));
        assert_eq!(settings["Rate"], AnalyzerSettingValue::Float(0.5));
        assert_eq!(settings["Mode"], AnalyzerSettingValue::String("8 Bits".to_string()));
    }

    #[test]
    fn hla_setting_values_map_to_oneof() {
        let v = pb::HighLevelAnalyzerSettingValue::from(&HighLevelAnalyzerSettingValue::from(3_i64));
        assert_eq!(v.value, Some(high_level_analyzer_setting_value::Value::NumberValue(3.0)));

        let v = pb::HighLevelAnalyzerSettingValue::from(&HighLevelAnalyzerSettingValue::from("abc"));
        assert_eq!(
            v.value,
            Some(high_level_analyzer_setting_value::Value::StringValue("abc".to_string()))
        );
    }

    #[test]
    fn data_table_configuration_radix_is_optional() {
        let handle = AnalyzerHandle { analyzer_id: 7 };

        let plain = pb::DataTableAnalyzerConfiguration::from(&DataTableExportConfiguration::from(handle));
        assert_eq!(plain.analyzer_id, 7);
        assert_eq!(plain.radix_type(), pb::RadixType::Unspecified);

        let hex = pb::DataTableAnalyzerConfiguration::from(&DataTableExportConfiguration {
            analyzer: handle,
            radix: Some(RadixType::Hexadecimal),
        });
        assert_eq!(hex.radix_type(), pb::RadixType::Hexadecimal);
    }

    #[test]
    fn raw_export_defaults_to_all_channels_without_downsampling() {
        let opts = RawDataExportOptions::default();
        assert_eq!(opts.analog_downsample_ratio, 1);
        let channels = opts.logic_channels();
        assert!(channels.analog_channels.is_empty());
        assert!(channels.digital_channels.is_empty());
    }
}
