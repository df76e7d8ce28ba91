/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Devices and per-device capture configuration.

use serde::{Deserialize, Serialize};

use crate::proto::saleae_automation as pb;
use crate::proto::saleae_automation::start_capture_request;

// ── Device type ───────────────────────────────────────────────────────────────

/// Saleae device model.
///
/// Mirrors the `DeviceType` proto enum.  `Unspecified` is kept as a real
/// variant so a newer Logic 2 reporting a model this client does not know
/// still lists the device instead of failing the whole `get_devices()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    Unspecified,
    Logic,
    Logic4,
    Logic8,
    Logic16,
    LogicPro8,
    LogicPro16,
}

impl DeviceType {
    /// Parse from the proto integer value.  Unknown values map to `Unspecified`.
    pub fn from_proto_int(v: i32) -> Self {
        match pb::DeviceType::try_from(v) {
            Ok(pb::DeviceType::Logic) => DeviceType::Logic,
            Ok(pb::DeviceType::Logic4) => DeviceType::Logic4,
            Ok(pb::DeviceType::Logic8) => DeviceType::Logic8,
            Ok(pb::DeviceType::Logic16) => DeviceType::Logic16,
            Ok(pb::DeviceType::LogicPro8) => DeviceType::LogicPro8,
            Ok(pb::DeviceType::LogicPro16) => DeviceType::LogicPro16,
            Ok(pb::DeviceType::Unspecified) | Err(_) => DeviceType::Unspecified,
        }
    }

    /// Convert to the proto enum.
    pub fn to_proto(self) -> pb::DeviceType {
        match self {
            DeviceType::Unspecified => pb::DeviceType::Unspecified,
            DeviceType::Logic => pb::DeviceType::Logic,
            DeviceType::Logic4 => pb::DeviceType::Logic4,
            DeviceType::Logic8 => pb::DeviceType::Logic8,
            DeviceType::Logic16 => pb::DeviceType::Logic16,
            DeviceType::LogicPro8 => pb::DeviceType::LogicPro8,
            DeviceType::LogicPro16 => pb::DeviceType::LogicPro16,
        }
    }

    /// Human-readable product name.
    pub fn display_name(self) -> &'static str {
        match self {
            DeviceType::Unspecified => "Unknown device",
            DeviceType::Logic => "Logic",
            DeviceType::Logic4 => "Logic 4",
            DeviceType::Logic8 => "Logic 8",
            DeviceType::Logic16 => "Logic 16",
            DeviceType::LogicPro8 => "Logic Pro 8",
            DeviceType::LogicPro16 => "Logic Pro 16",
        }
    }
}

/// A device attached to (or simulated by) Logic 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDesc {
    /// Id to pass to `start_capture()`.
    pub device_id: String,
    pub device_type: DeviceType,
    /// `true` for simulation devices.
    pub is_simulation: bool,
}

impl From<pb::Device> for DeviceDesc {
    fn from(d: pb::Device) -> Self {
        Self {
            device_type: DeviceType::from_proto_int(d.device_type),
            device_id: d.device_id,
            is_simulation: d.is_simulation,
        }
    }
}

// ── Logic device configuration ────────────────────────────────────────────────

/// Glitch filter settings for one digital channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlitchFilterEntry {
    pub channel_index: u32,
    /// Minimum pulse width in seconds.  Logic 2 rounds this to the nearest
    /// number of samples.
    pub pulse_width_seconds: f64,
}

/// Capture configuration for Logic 8, Logic Pro 8 and Logic Pro 16.
///
/// Sample rates must match one offered by the Logic 2 UI for the enabled
/// channel set.  `digital_threshold_volts` is only meaningful on the Pro
/// models (1.2, 1.8 or 3.3); leave it unset for Logic 8.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogicDeviceConfiguration {
    pub enabled_analog_channels: Vec<u32>,
    pub enabled_digital_channels: Vec<u32>,
    pub analog_sample_rate: Option<u32>,
    pub digital_sample_rate: Option<u32>,
    pub digital_threshold_volts: Option<f64>,
    pub glitch_filters: Vec<GlitchFilterEntry>,
}

impl LogicDeviceConfiguration {
    /// Returns `true` if no channel of either kind is enabled.
    pub fn has_no_channels(&self) -> bool {
        self.enabled_analog_channels.is_empty() && self.enabled_digital_channels.is_empty()
    }
}

impl From<&LogicDeviceConfiguration> for pb::LogicDeviceConfiguration {
    fn from(cfg: &LogicDeviceConfiguration) -> Self {
        Self {
            logic_channels: Some(pb::LogicChannels {
                analog_channels: cfg.enabled_analog_channels.clone(),
                digital_channels: cfg.enabled_digital_channels.clone(),
            }),
            digital_sample_rate: cfg.digital_sample_rate.unwrap_or_default(),
            analog_sample_rate: cfg.analog_sample_rate.unwrap_or_default(),
            digital_threshold_volts: cfg.digital_threshold_volts.unwrap_or_default(),
            glitch_filters: cfg
                .glitch_filters
                .iter()
                .map(|gf| pb::GlitchFilterEntry {
                    channel_index: gf.channel_index,
                    pulse_width_seconds: gf.pulse_width_seconds,
                })
                .collect(),
        }
    }
}

/// Device-specific capture configuration passed to `start_capture()`.
///
/// Only Logic devices exist today; the enum leaves room for other families
/// without changing the `start_capture()` signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceConfiguration {
    Logic(LogicDeviceConfiguration),
}

impl From<LogicDeviceConfiguration> for DeviceConfiguration {
    fn from(cfg: LogicDeviceConfiguration) -> Self {
        DeviceConfiguration::Logic(cfg)
    }
}

impl From<&DeviceConfiguration> for start_capture_request::DeviceConfiguration {
    fn from(cfg: &DeviceConfiguration) -> Self {
        match cfg {
            DeviceConfiguration::Logic(logic) => {
                start_capture_request::DeviceConfiguration::LogicDeviceConfiguration(logic.into())
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_round_trips_known_values() {
        for t in [
            DeviceType::Logic,
            DeviceType::Logic4,
            DeviceType::Logic8,
            DeviceType::Logic16,
            DeviceType::LogicPro8,
            DeviceType::LogicPro16,
        ] {
            assert_eq!(DeviceType::from_proto_int(t.to_proto() as i32), t);
        }
    }

    #[test]
    fn unknown_device_type_maps_to_unspecified() {
        assert_eq!(DeviceType::from_proto_int(99), DeviceType::Unspecified);
        assert_eq!(DeviceType::from_proto_int(-1), DeviceType::Unspecified);
    }

    #[test]
    fn device_desc_from_proto() {
        let desc = DeviceDesc::from(pb::Device {
            device_id: "F4241".to_string(),
            device_type: pb::DeviceType::LogicPro16 as i32,
            is_simulation: true,
        });
        assert_eq!(desc.device_id, "F4241");
        assert_eq!(desc.device_type, DeviceType::LogicPro16);
        assert!(desc.is_simulation);
    }

    #[test]
    fn logic_configuration_to_proto() {
        let cfg = LogicDeviceConfiguration {
            enabled_analog_channels: vec![0, 1],
            enabled_digital_channels: vec![0, 3, 4],
            analog_sample_rate: Some(6_250_000),
            digital_sample_rate: Some(500_000_000),
            digital_threshold_volts: Some(3.3),
            glitch_filters: vec![GlitchFilterEntry {
                channel_index: 3,
                pulse_width_seconds: 1e-6,
            }],
        };
        let out = pb::LogicDeviceConfiguration::from(&cfg);

        let channels = out.logic_channels.unwrap();
        assert_eq!(channels.analog_channels, vec![0, 1]);
        assert_eq!(channels.digital_channels, vec![0, 3, 4]);
        assert_eq!(out.analog_sample_rate, 6_250_000);
        assert_eq!(out.digital_sample_rate, 500_000_000);
        assert_eq!(out.digital_threshold_volts, 3.3);
        assert_eq!(out.glitch_filters.len(), 1);
        assert_eq!(out.glitch_filters[0].channel_index, 3);
    }

    #[test]
    fn unset_optionals_are_sent_as_zero() {
        let cfg = LogicDeviceConfiguration {
            enabled_digital_channels: vec![0],
            ..Default::default()
        };
        let out = pb::LogicDeviceConfiguration::from(&cfg);
        assert_eq!(out.analog_sample_rate, 0);
        assert_eq!(out.digital_sample_rate, 0);
        assert_eq!(out.digital_threshold_volts, 0.0);
        assert!(out.glitch_filters.is_empty());
    }

    #[test]
    fn has_no_channels() {
        assert!(LogicDeviceConfiguration::default().has_no_channels());
        let cfg = LogicDeviceConfiguration {
            enabled_analog_channels: vec![2],
            ..Default::default()
        };
        assert!(!cfg.has_no_channels());
    }
}
