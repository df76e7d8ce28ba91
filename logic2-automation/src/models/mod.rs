/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Value types exchanged with Logic 2.
//!
//! The generated proto messages carry enums as raw `i32`s and optional values
//! as proto3 zero defaults.  The types here are what callers build and receive
//! instead: typed enums, `Option`s for values that may be left unset, and
//! closed sum types for "one of" choices.  Each type converts to or from its
//! wire message at the RPC boundary.
//!
//! ```text
//! caller ──► LogicDeviceConfiguration / CaptureConfiguration ──(From)──► proto request
//! caller ◄── AppInfo / DeviceDesc ◄──(From)── proto reply
//! ```

pub mod capture;
pub mod device;

pub use capture::{
    CaptureConfiguration, CaptureMode, DigitalTriggerCaptureMode, DigitalTriggerLinkedChannel,
    DigitalTriggerLinkedChannelState, DigitalTriggerType, ManualCaptureMode, TimedCaptureMode,
};
pub use device::{
    DeviceConfiguration, DeviceDesc, DeviceType, GlitchFilterEntry, LogicDeviceConfiguration,
};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::proto::saleae_automation as pb;

// ── Version / AppInfo ─────────────────────────────────────────────────────────

/// Semantic version of the automation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl From<pb::Version> for Version {
    fn from(v: pb::Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
        }
    }
}

impl From<Version> for pb::Version {
    fn from(v: Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
        }
    }
}

/// Information about the connected Logic 2 instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Version of `saleae.proto` the server is using.
    pub api_version: Version,

    /// Logic 2 application version string.
    pub app_version: String,

    /// PID of the main Logic 2 process.
    pub app_pid: u64,
}

impl From<pb::AppInfo> for AppInfo {
    fn from(info: pb::AppInfo) -> Self {
        Self {
            api_version: info.api_version.map(Version::from).unwrap_or_default(),
            app_version: info.application_version,
            app_pid: info.launch_pid,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
