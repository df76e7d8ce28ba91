/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory stand-in for the Logic 2 automation server.
//!
//! Behaves like Logic 2 with only simulation devices attached:
//!
//! | Device id | Model | Digital / analog channels | Thresholds (V) |
//! |---|---|---|---|
//! | `F4241` | Logic Pro 16 | 16 / 16 | 0, 1.2, 1.8, 3.3 |
//! | `F4243` | Logic 8 | 8 / 8 | 0 |
//! | `F4244` | Logic Pro 8 | 8 / 8 | 0, 1.2, 1.8, 3.3 |
//!
//! Captures finish instantly.  Exports and saves write small placeholder
//! files so callers can check that the requested paths were produced.
//! Failures use the same `ABORTED` + `"<code>: <message>"` format as Logic 2.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use logic2_automation::proto::saleae_automation as pb;
use logic2_automation::proto::saleae_automation::manager_server::Manager as ManagerService;
use logic2_automation::proto::saleae_automation::{
    capture_configuration, start_capture_request, ErrorCode,
};
use logic2_automation::proto::{
    THIS_API_VERSION_MAJOR, THIS_API_VERSION_MINOR, THIS_API_VERSION_PATCH,
};

// ── Simulated hardware ────────────────────────────────────────────────────────

struct SimDevice {
    device_id: &'static str,
    device_type: pb::DeviceType,
    channel_count: u32,
    thresholds: &'static [f64],
}

const PRO_THRESHOLDS: &[f64] = &[0.0, 1.2, 1.8, 3.3];
const FIXED_THRESHOLD: &[f64] = &[0.0];

const SIM_DEVICES: &[SimDevice] = &[
    SimDevice {
        device_id: "F4241",
        device_type: pb::DeviceType::LogicPro16,
        channel_count: 16,
        thresholds: PRO_THRESHOLDS,
    },
    SimDevice {
        device_id: "F4243",
        device_type: pb::DeviceType::Logic8,
        channel_count: 8,
        thresholds: FIXED_THRESHOLD,
    },
    SimDevice {
        device_id: "F4244",
        device_type: pb::DeviceType::LogicPro8,
        channel_count: 8,
        thresholds: PRO_THRESHOLDS,
    },
];

fn find_device(device_id: &str) -> Option<&'static SimDevice> {
    SIM_DEVICES.iter().find(|d| d.device_id == device_id)
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// An application-level failure, sent to the client as `ABORTED`.
#[derive(Debug)]
struct SimError {
    code: ErrorCode,
    message: String,
}

impl SimError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }
}

impl From<SimError> for Status {
    fn from(e: SimError) -> Self {
        Status::aborted(format!("{}: {}", e.code as i32, e.message))
    }
}

type SimResult<T> = Result<T, SimError>;

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimMode {
    Manual,
    Timed,
    Trigger,
    Loaded,
}

#[derive(Debug)]
struct SimAnalyzer {
    label: String,
    high_level: bool,
}

#[derive(Debug)]
struct SimCapture {
    device_id: String,
    mode: SimMode,
    recording: bool,
    digital_channels: Vec<u32>,
    analog_channels: Vec<u32>,
    analyzers: BTreeMap<u64, SimAnalyzer>,
}

impl SimCapture {
    fn ensure_finished(&self, capture_id: u64) -> SimResult<()> {
        if self.recording {
            return Err(SimError::invalid(format!(
                "capture {capture_id} is still recording"
            )));
        }
        Ok(())
    }
}

/// On-disk form of a capture written by `SaveCapture`.
#[derive(Debug, Serialize, Deserialize)]
struct SavedCapture {
    device_id: String,
    digital_channels: Vec<u32>,
    analog_channels: Vec<u32>,
}

#[derive(Debug, Default)]
struct SimState {
    last_capture_id: u64,
    last_analyzer_id: u64,
    captures: HashMap<u64, SimCapture>,
}

impl SimState {
    fn capture(&self, capture_id: u64) -> SimResult<&SimCapture> {
        self.captures
            .get(&capture_id)
            .ok_or_else(|| SimError::invalid(format!("capture {capture_id} not found")))
    }

    fn capture_mut(&mut self, capture_id: u64) -> SimResult<&mut SimCapture> {
        self.captures
            .get_mut(&capture_id)
            .ok_or_else(|| SimError::invalid(format!("capture {capture_id} not found")))
    }

    fn insert_capture(&mut self, capture: SimCapture) -> u64 {
        self.last_capture_id += 1;
        self.captures.insert(self.last_capture_id, capture);
        self.last_capture_id
    }

    fn next_analyzer_id(&mut self) -> u64 {
        self.last_analyzer_id += 1;
        self.last_analyzer_id
    }
}

// ── SimulatedLogic2 ───────────────────────────────────────────────────────────

/// Identity the simulator reports through `GetAppInfo`.
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    pub launch_pid: u64,
    pub application_version: String,
    pub api_version: (u32, u32, u32),
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            launch_pid: u64::from(std::process::id()),
            application_version: "2.4.0-sim".to_string(),
            api_version: (
                THIS_API_VERSION_MAJOR,
                THIS_API_VERSION_MINOR,
                THIS_API_VERSION_PATCH,
            ),
        }
    }
}

/// Implements the generated `Manager` service.  Cheap to clone; clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLogic2 {
    options: SimulatorOptions,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedLogic2 {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            options,
            state: Arc::default(),
        }
    }

    /// Number of captures currently open.
    pub async fn open_capture_count(&self) -> usize {
        self.state.lock().await.captures.len()
    }
}

fn validate_logic_configuration(
    device: &SimDevice,
    cfg: &pb::LogicDeviceConfiguration,
) -> SimResult<(Vec<u32>, Vec<u32>)> {
    let channels = cfg.logic_channels.clone().unwrap_or_default();
    if channels.digital_channels.is_empty() && channels.analog_channels.is_empty() {
        return Err(SimError::invalid("no channels enabled"));
    }

    let out_of_range = channels
        .digital_channels
        .iter()
        .chain(channels.analog_channels.iter())
        .find(|&&ch| ch >= device.channel_count);
    if let Some(ch) = out_of_range {
        return Err(SimError::invalid(format!(
            "channel {ch} does not exist on {}",
            device.device_id
        )));
    }

    let threshold = cfg.digital_threshold_volts;
    if !device
        .thresholds
        .iter()
        .any(|t| (t - threshold).abs() < 1e-6)
    {
        return Err(SimError::invalid(format!(
            "digital threshold {threshold} V is not supported by {}",
            device.device_id
        )));
    }

    for gf in &cfg.glitch_filters {
        if !channels.digital_channels.contains(&gf.channel_index) {
            return Err(SimError::invalid(format!(
                "glitch filter on disabled channel {}",
                gf.channel_index
            )));
        }
    }

    Ok((channels.digital_channels, channels.analog_channels))
}

fn capture_mode(cfg: Option<&pb::CaptureConfiguration>) -> SimResult<SimMode> {
    match cfg.and_then(|c| c.capture_mode.as_ref()) {
        None | Some(capture_configuration::CaptureMode::ManualCaptureMode(_)) => Ok(SimMode::Manual),
        Some(capture_configuration::CaptureMode::TimedCaptureMode(m)) => {
            if m.duration_seconds <= 0.0 {
                return Err(SimError::invalid("duration_seconds must be positive"));
            }
            Ok(SimMode::Timed)
        }
        Some(capture_configuration::CaptureMode::DigitalCaptureMode(m)) => {
            if m.trigger_type() == pb::DigitalTriggerType::Unspecified {
                return Err(SimError::invalid("trigger type not set"));
            }
            Ok(SimMode::Trigger)
        }
    }
}

fn ensure_directory(directory: &str) -> SimResult<()> {
    if !Path::new(directory).is_dir() {
        return Err(SimError::new(
            ErrorCode::ExportFailed,
            format!("directory {directory} does not exist"),
        ));
    }
    Ok(())
}

fn ensure_parent_directory(filepath: &str) -> SimResult<()> {
    match Path::new(filepath).parent() {
        Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => Ok(()),
        _ => Err(SimError::new(
            ErrorCode::ExportFailed,
            format!("parent directory of {filepath} does not exist"),
        )),
    }
}

fn write_file(path: &Path, contents: &[u8]) -> SimResult<()> {
    std::fs::write(path, contents).map_err(|e| {
        SimError::new(
            ErrorCode::ExportFailed,
            format!("failed to write {}: {e}", path.display()),
        )
    })
}

/// Channels to export: the requested ones, or every captured channel when
/// none were requested.
fn export_channels(
    capture: &SimCapture,
    requested: Option<&pb::LogicChannels>,
) -> SimResult<(Vec<u32>, Vec<u32>)> {
    let requested = requested.cloned().unwrap_or_default();
    if requested.digital_channels.is_empty() && requested.analog_channels.is_empty() {
        return Ok((
            capture.digital_channels.clone(),
            capture.analog_channels.clone(),
        ));
    }
    for ch in &requested.digital_channels {
        if !capture.digital_channels.contains(ch) {
            return Err(SimError::invalid(format!("digital channel {ch} was not captured")));
        }
    }
    for ch in &requested.analog_channels {
        if !capture.analog_channels.contains(ch) {
            return Err(SimError::invalid(format!("analog channel {ch} was not captured")));
        }
    }
    Ok((requested.digital_channels, requested.analog_channels))
}

/// Analog samples per channel in a simulated recording.
const ANALOG_SAMPLES: u64 = 10;
/// Seconds between simulated samples.
const SAMPLE_PERIOD_SECONDS: f64 = 1e-6;

/// Simulated recordings start at the Unix epoch.
fn timestamp(sample: u64, iso8601: bool) -> String {
    let seconds = sample as f64 * SAMPLE_PERIOD_SECONDS;
    if iso8601 {
        format!("1970-01-01T00:00:{seconds:012.9}Z")
    } else {
        format!("{seconds:.9}")
    }
}

const DATA_TABLE_COLUMNS: &[&str] = &["name", "type", "start_time", "duration"];

/// One data table row per analyzer, keyed by column name.
fn data_table_row(label: &str, iso8601: bool) -> Vec<(&'static str, String)> {
    vec![
        ("name", format!("\"{label}\"")),
        ("type", "result".to_string()),
        ("start_time", timestamp(0, iso8601)),
        ("duration", "0".to_string()),
    ]
}

/// A row passes when the query is empty or appears in one of the filtered
/// columns (every column if none are named).
fn row_matches(row: &[(&str, String)], filter: Option<&pb::DataTableFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if filter.query.is_empty() {
        return true;
    }
    row.iter()
        .filter(|(column, _)| filter.columns.is_empty() || filter.columns.iter().any(|c| c == column))
        .any(|(_, value)| value.contains(&filter.query))
}

fn csv_header(channels: &[u32]) -> String {
    let mut header = String::from("Time [s]");
    for ch in channels {
        header.push_str(&format!(",Channel {ch}"));
    }
    header.push('\n');
    header
}

#[tonic::async_trait]
impl ManagerService for SimulatedLogic2 {
    async fn get_app_info(
        &self,
        _request: Request<pb::GetAppInfoRequest>,
    ) -> Result<Response<pb::GetAppInfoReply>, Status> {
        let (major, minor, patch) = self.options.api_version;
        Ok(Response::new(pb::GetAppInfoReply {
            app_info: Some(pb::AppInfo {
                api_version: Some(pb::Version {
                    major,
                    minor,
                    patch,
                }),
                application_version: self.options.application_version.clone(),
                launch_pid: self.options.launch_pid,
            }),
        }))
    }

    async fn get_devices(
        &self,
        request: Request<pb::GetDevicesRequest>,
    ) -> Result<Response<pb::GetDevicesReply>, Status> {
        let req = request.into_inner();
        let devices = if req.include_simulation_devices {
            SIM_DEVICES
                .iter()
                .map(|d| pb::Device {
                    device_id: d.device_id.to_string(),
                    device_type: d.device_type as i32,
                    is_simulation: true,
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok(Response::new(pb::GetDevicesReply { devices }))
    }

    async fn start_capture(
        &self,
        request: Request<pb::StartCaptureRequest>,
    ) -> Result<Response<pb::StartCaptureReply>, Status> {
        let req = request.into_inner();

        let device = if req.device_id.is_empty() {
            &SIM_DEVICES[0]
        } else {
            find_device(&req.device_id).ok_or_else(|| {
                SimError::new(
                    ErrorCode::MissingDevice,
                    format!("device {} not found", req.device_id),
                )
            })?
        };

        let logic = match &req.device_configuration {
            Some(start_capture_request::DeviceConfiguration::LogicDeviceConfiguration(cfg)) => cfg,
            None => return Err(SimError::invalid("device configuration missing").into()),
        };
        let (digital_channels, analog_channels) = validate_logic_configuration(device, logic)?;
        let mode = capture_mode(req.capture_configuration.as_ref())?;

        let capture_id = self.state.lock().await.insert_capture(SimCapture {
            device_id: device.device_id.to_string(),
            mode,
            recording: true,
            digital_channels,
            analog_channels,
            analyzers: BTreeMap::new(),
        });

        info!(capture_id, device_id = device.device_id, ?mode, "Simulated capture started");
        Ok(Response::new(pb::StartCaptureReply {
            capture_info: Some(pb::CaptureInfo { capture_id }),
        }))
    }

    async fn stop_capture(
        &self,
        request: Request<pb::StopCaptureRequest>,
    ) -> Result<Response<pb::StopCaptureReply>, Status> {
        let capture_id = request.into_inner().capture_id;
        let mut state = self.state.lock().await;
        let capture = state.capture_mut(capture_id)?;
        if !capture.recording {
            return Err(SimError::invalid(format!("capture {capture_id} is not recording")).into());
        }
        capture.recording = false;
        debug!(capture_id, "Simulated capture stopped");
        Ok(Response::new(pb::StopCaptureReply {}))
    }

    async fn wait_capture(
        &self,
        request: Request<pb::WaitCaptureRequest>,
    ) -> Result<Response<pb::WaitCaptureReply>, Status> {
        let capture_id = request.into_inner().capture_id;
        let mut state = self.state.lock().await;
        let capture = state.capture_mut(capture_id)?;
        if capture.mode == SimMode::Manual {
            return Err(SimError::invalid("cannot wait on a manual capture, use stop").into());
        }
        if !capture.recording {
            return Err(SimError::invalid(format!("capture {capture_id} is not recording")).into());
        }
        capture.recording = false;
        debug!(capture_id, "Simulated capture completed");
        Ok(Response::new(pb::WaitCaptureReply {}))
    }

    async fn load_capture(
        &self,
        request: Request<pb::LoadCaptureRequest>,
    ) -> Result<Response<pb::LoadCaptureReply>, Status> {
        let filepath = request.into_inner().filepath;
        let content = std::fs::read_to_string(&filepath).map_err(|e| {
            SimError::new(
                ErrorCode::LoadCaptureFailed,
                format!("cannot open {filepath}: {e}"),
            )
        })?;
        let saved: SavedCapture = serde_yaml::from_str(&content).map_err(|_| {
            SimError::new(
                ErrorCode::LoadCaptureFailed,
                format!("{filepath} is not a capture file"),
            )
        })?;

        let capture_id = self.state.lock().await.insert_capture(SimCapture {
            device_id: saved.device_id,
            mode: SimMode::Loaded,
            recording: false,
            digital_channels: saved.digital_channels,
            analog_channels: saved.analog_channels,
            analyzers: BTreeMap::new(),
        });
        info!(capture_id, filepath = %filepath, "Simulated capture loaded");
        Ok(Response::new(pb::LoadCaptureReply {
            capture_info: Some(pb::CaptureInfo { capture_id }),
        }))
    }

    async fn save_capture(
        &self,
        request: Request<pb::SaveCaptureRequest>,
    ) -> Result<Response<pb::SaveCaptureReply>, Status> {
        let req = request.into_inner();
        let state = self.state.lock().await;
        let capture = state.capture(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        ensure_parent_directory(&req.filepath)?;

        let saved = SavedCapture {
            device_id: capture.device_id.clone(),
            digital_channels: capture.digital_channels.clone(),
            analog_channels: capture.analog_channels.clone(),
        };
        let yaml = serde_yaml::to_string(&saved)
            .map_err(|e| SimError::new(ErrorCode::InternalException, e.to_string()))?;
        write_file(Path::new(&req.filepath), yaml.as_bytes())?;
        Ok(Response::new(pb::SaveCaptureReply {}))
    }

    async fn close_capture(
        &self,
        request: Request<pb::CloseCaptureRequest>,
    ) -> Result<Response<pb::CloseCaptureReply>, Status> {
        let capture_id = request.into_inner().capture_id;
        let mut state = self.state.lock().await;
        if state.captures.remove(&capture_id).is_none() {
            return Err(SimError::invalid(format!("capture {capture_id} not found")).into());
        }
        debug!(capture_id, "Simulated capture closed");
        Ok(Response::new(pb::CloseCaptureReply {}))
    }

    async fn add_analyzer(
        &self,
        request: Request<pb::AddAnalyzerRequest>,
    ) -> Result<Response<pb::AddAnalyzerReply>, Status> {
        let req = request.into_inner();
        if req.analyzer_name.is_empty() {
            return Err(SimError::invalid("analyzer name is empty").into());
        }
        if req.settings.values().any(|v| v.value.is_none()) {
            return Err(SimError::invalid("analyzer setting without a value").into());
        }

        let mut state = self.state.lock().await;
        state.capture(req.capture_id)?.ensure_finished(req.capture_id)?;
        let analyzer_id = state.next_analyzer_id();
        let label = if req.analyzer_label.is_empty() {
            req.analyzer_name.clone()
        } else {
            req.analyzer_label
        };
        state.capture_mut(req.capture_id)?.analyzers.insert(
            analyzer_id,
            SimAnalyzer {
                label,
                high_level: false,
            },
        );
        debug!(capture_id = req.capture_id, analyzer_id, name = %req.analyzer_name, "Simulated analyzer added");
        Ok(Response::new(pb::AddAnalyzerReply { analyzer_id }))
    }

    async fn remove_analyzer(
        &self,
        request: Request<pb::RemoveAnalyzerRequest>,
    ) -> Result<Response<pb::RemoveAnalyzerReply>, Status> {
        let req = request.into_inner();
        let mut state = self.state.lock().await;
        let capture = state.capture_mut(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        match capture.analyzers.get(&req.analyzer_id).map(|a| a.high_level) {
            Some(false) => {
                capture.analyzers.remove(&req.analyzer_id);
                Ok(Response::new(pb::RemoveAnalyzerReply {}))
            }
            _ => Err(SimError::invalid(format!("analyzer {} not found", req.analyzer_id)).into()),
        }
    }

    async fn add_high_level_analyzer(
        &self,
        request: Request<pb::AddHighLevelAnalyzerRequest>,
    ) -> Result<Response<pb::AddHighLevelAnalyzerReply>, Status> {
        let req = request.into_inner();
        if req.hla_name.is_empty() || req.extension_directory.is_empty() {
            return Err(SimError::invalid("extension directory and name are required").into());
        }

        let mut state = self.state.lock().await;
        let capture = state.capture(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        if !capture.analyzers.contains_key(&req.input_analyzer_id) {
            return Err(SimError::invalid(format!(
                "input analyzer {} not found",
                req.input_analyzer_id
            ))
            .into());
        }

        let analyzer_id = state.next_analyzer_id();
        let label = if req.hla_label.is_empty() {
            req.hla_name
        } else {
            req.hla_label
        };
        state.capture_mut(req.capture_id)?.analyzers.insert(
            analyzer_id,
            SimAnalyzer {
                label,
                high_level: true,
            },
        );
        Ok(Response::new(pb::AddHighLevelAnalyzerReply { analyzer_id }))
    }

    async fn remove_high_level_analyzer(
        &self,
        request: Request<pb::RemoveHighLevelAnalyzerRequest>,
    ) -> Result<Response<pb::RemoveHighLevelAnalyzerReply>, Status> {
        let req = request.into_inner();
        let mut state = self.state.lock().await;
        let capture = state.capture_mut(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        match capture.analyzers.get(&req.analyzer_id).map(|a| a.high_level) {
            Some(true) => {
                capture.analyzers.remove(&req.analyzer_id);
                Ok(Response::new(pb::RemoveHighLevelAnalyzerReply {}))
            }
            _ => Err(SimError::invalid(format!(
                "high level analyzer {} not found",
                req.analyzer_id
            ))
            .into()),
        }
    }

    async fn export_raw_data_csv(
        &self,
        request: Request<pb::ExportRawDataCsvRequest>,
    ) -> Result<Response<pb::ExportRawDataCsvReply>, Status> {
        let req = request.into_inner();
        let state = self.state.lock().await;
        let capture = state.capture(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        if req.analog_downsample_ratio == 0 {
            return Err(SimError::invalid("analog_downsample_ratio must be at least 1").into());
        }
        ensure_directory(&req.directory)?;
        let (digital, analog) = export_channels(capture, req.logic_channels.as_ref())?;

        let dir = Path::new(&req.directory);
        if !digital.is_empty() {
            let mut body = csv_header(&digital);
            body.push_str(&timestamp(0, req.iso8601_timestamp));
            body.push_str(&",0".repeat(digital.len()));
            body.push('\n');
            write_file(&dir.join("digital.csv"), body.as_bytes())?;
        }
        if !analog.is_empty() {
            let mut body = csv_header(&analog);
            for sample in (0..ANALOG_SAMPLES).step_by(req.analog_downsample_ratio as usize) {
                body.push_str(&timestamp(sample, req.iso8601_timestamp));
                body.push_str(&",0.0".repeat(analog.len()));
                body.push('\n');
            }
            write_file(&dir.join("analog.csv"), body.as_bytes())?;
        }
        Ok(Response::new(pb::ExportRawDataCsvReply {}))
    }

    async fn export_raw_data_binary(
        &self,
        request: Request<pb::ExportRawDataBinaryRequest>,
    ) -> Result<Response<pb::ExportRawDataBinaryReply>, Status> {
        let req = request.into_inner();
        let state = self.state.lock().await;
        let capture = state.capture(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        if req.analog_downsample_ratio == 0 {
            return Err(SimError::invalid("analog_downsample_ratio must be at least 1").into());
        }
        ensure_directory(&req.directory)?;
        let (digital, analog) = export_channels(capture, req.logic_channels.as_ref())?;

        let dir = Path::new(&req.directory);
        for ch in digital {
            write_file(&dir.join(format!("digital_{ch}.bin")), b"<SALEAE>")?;
        }
        for ch in analog {
            write_file(&dir.join(format!("analog_{ch}.bin")), b"<SALEAE>")?;
        }
        Ok(Response::new(pb::ExportRawDataBinaryReply {}))
    }

    async fn export_data_table_csv(
        &self,
        request: Request<pb::ExportDataTableCsvRequest>,
    ) -> Result<Response<pb::ExportDataTableCsvReply>, Status> {
        let req = request.into_inner();
        let state = self.state.lock().await;
        let capture = state.capture(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        if req.analyzers.is_empty() {
            return Err(SimError::invalid("no analyzers selected for export").into());
        }
        ensure_parent_directory(&req.filepath)?;

        let columns: Vec<&str> = if req.export_columns.is_empty() {
            DATA_TABLE_COLUMNS.to_vec()
        } else {
            req.export_columns.iter().map(String::as_str).collect()
        };
        if let Some(unknown) = columns.iter().find(|c| !DATA_TABLE_COLUMNS.contains(c)) {
            return Err(SimError::invalid(format!("unknown data table column {unknown}")).into());
        }

        let mut body = format!("{}\n", columns.join(","));
        for cfg in &req.analyzers {
            let analyzer = capture.analyzers.get(&cfg.analyzer_id).ok_or_else(|| {
                SimError::invalid(format!("analyzer {} not found", cfg.analyzer_id))
            })?;
            let row = data_table_row(&analyzer.label, req.iso8601_timestamp);
            if !row_matches(&row, req.filter.as_ref()) {
                continue;
            }
            let fields: Vec<&str> = columns
                .iter()
                .filter_map(|c| row.iter().find(|(name, _)| name == c).map(|(_, v)| v.as_str()))
                .collect();
            body.push_str(&fields.join(","));
            body.push('\n');
        }
        debug!(filepath = %req.filepath, filter = ?req.filter, "Data table written");
        write_file(Path::new(&req.filepath), body.as_bytes())?;
        Ok(Response::new(pb::ExportDataTableCsvReply {}))
    }

    async fn legacy_export_analyzer(
        &self,
        request: Request<pb::LegacyExportAnalyzerRequest>,
    ) -> Result<Response<pb::LegacyExportAnalyzerReply>, Status> {
        let req = request.into_inner();
        let state = self.state.lock().await;
        let capture = state.capture(req.capture_id)?;
        capture.ensure_finished(req.capture_id)?;
        let analyzer = capture.analyzers.get(&req.analyzer_id).ok_or_else(|| {
            SimError::invalid(format!("analyzer {} not found", req.analyzer_id))
        })?;
        if analyzer.high_level {
            warn!(analyzer_id = req.analyzer_id, "Legacy export requested for a high level analyzer");
            return Err(SimError::invalid("high level analyzers have no legacy export").into());
        }
        ensure_parent_directory(&req.filepath)?;

        let body = format!("Time [s],{}\n0.000000000,0\n", analyzer.label);
        write_file(Path::new(&req.filepath), body.as_bytes())?;
        Ok(Response::new(pb::LegacyExportAnalyzerReply {}))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
