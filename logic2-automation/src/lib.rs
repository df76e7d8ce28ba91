/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Logic 2 automation client.
//!
//! Drives a running Saleae Logic 2 application through its gRPC automation
//! API: list devices, start or load captures, add analyzers, export data.
//!
//! ```text
//! lib.rs
//! ├── proto/          – generated gRPC/protobuf types & stubs (client + server)
//! ├── errors          – SaleaeError and status → error mapping
//! ├── models/         – device / capture-mode / app-info value types
//! ├── manager/        – connect to or launch Logic 2, start & load captures
//! ├── capture         – analyzers, exports, save, stop / wait / close
//! ├── config/         – YAML capture job files
//! └── job             – runs a capture job end to end
//! ```

pub mod capture;
pub mod config;
pub mod errors;
pub mod job;
pub mod manager;
pub mod models;
pub mod proto;

pub use capture::{
    AnalyzerHandle, AnalyzerSettingValue, Capture, DataTableExportConfiguration,
    DataTableExportOptions, DataTableFilter, HighLevelAnalyzerSettingValue, RadixType,
    RawDataExportOptions,
};
pub use errors::{Result, SaleaeError};
pub use manager::{ConnectOptions, LaunchOptions, Manager};
pub use models::{
    AppInfo, CaptureConfiguration, CaptureMode, DeviceConfiguration, DeviceDesc, DeviceType,
    DigitalTriggerCaptureMode, DigitalTriggerLinkedChannel, DigitalTriggerLinkedChannelState,
    DigitalTriggerType, GlitchFilterEntry, LogicDeviceConfiguration, ManualCaptureMode,
    TimedCaptureMode, Version,
};
