/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Capture modes and the top-level capture configuration.
//!
//! Three modes decide when a capture ends:
//!
//! | Mode | Ends when | Finish with |
//! |---|---|---|
//! | [`ManualCaptureMode`] | the caller says so | `Capture::stop()` |
//! | [`TimedCaptureMode`] | `duration_seconds` have been recorded | `Capture::wait()` |
//! | [`DigitalTriggerCaptureMode`] | the trigger fired and post-trigger data is recorded | `Capture::wait()` |

use serde::{Deserialize, Serialize};

use crate::proto::saleae_automation as pb;
use crate::proto::saleae_automation::capture_configuration;

// ── Digital trigger ───────────────────────────────────────────────────────────

/// Edge or pulse that fires a digital trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalTriggerType {
    Rising,
    Falling,
    PulseHigh,
    PulseLow,
}

impl DigitalTriggerType {
    pub fn to_proto(self) -> pb::DigitalTriggerType {
        match self {
            DigitalTriggerType::Rising => pb::DigitalTriggerType::Rising,
            DigitalTriggerType::Falling => pb::DigitalTriggerType::Falling,
            DigitalTriggerType::PulseHigh => pb::DigitalTriggerType::PulseHigh,
            DigitalTriggerType::PulseLow => pb::DigitalTriggerType::PulseLow,
        }
    }

    /// `true` for the pulse trigger types, the only ones that honour pulse
    /// width limits.
    pub fn is_pulse(self) -> bool {
        matches!(
            self,
            DigitalTriggerType::PulseHigh | DigitalTriggerType::PulseLow
        )
    }
}

/// Required level of a linked channel while the trigger event is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalTriggerLinkedChannelState {
    Low,
    High,
}

impl DigitalTriggerLinkedChannelState {
    pub fn to_proto(self) -> pb::DigitalTriggerLinkedChannelState {
        match self {
            DigitalTriggerLinkedChannelState::Low => pb::DigitalTriggerLinkedChannelState::Low,
            DigitalTriggerLinkedChannelState::High => pb::DigitalTriggerLinkedChannelState::High,
        }
    }
}

/// A digital channel that must hold `state` while the trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DigitalTriggerLinkedChannel {
    pub channel_index: u32,
    pub state: DigitalTriggerLinkedChannelState,
}

// ── Capture modes ─────────────────────────────────────────────────────────────

/// Record until the trigger condition is found, then keep recording for
/// `after_trigger_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DigitalTriggerCaptureMode {
    pub trigger_type: DigitalTriggerType,
    pub trigger_channel_index: u32,

    /// Minimum pulse width in seconds (pulse triggers only).
    #[serde(default)]
    pub min_pulse_width_seconds: Option<f64>,

    /// Maximum pulse width in seconds (pulse triggers only).
    #[serde(default)]
    pub max_pulse_width_seconds: Option<f64>,

    #[serde(default)]
    pub linked_channels: Vec<DigitalTriggerLinkedChannel>,

    /// Seconds of data at the end of the capture to keep.  `None` keeps all.
    #[serde(default)]
    pub trim_data_seconds: Option<f64>,

    /// Seconds of data to record after the trigger.
    #[serde(default)]
    pub after_trigger_seconds: Option<f64>,
}

impl DigitalTriggerCaptureMode {
    /// Trigger on `trigger_type` at `channel` with every optional setting left
    /// at its default.
    pub fn new(trigger_type: DigitalTriggerType, channel: u32) -> Self {
        Self {
            trigger_type,
            trigger_channel_index: channel,
            min_pulse_width_seconds: None,
            max_pulse_width_seconds: None,
            linked_channels: Vec::new(),
            trim_data_seconds: None,
            after_trigger_seconds: None,
        }
    }
}

/// Record for a fixed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimedCaptureMode {
    pub duration_seconds: f64,

    /// Keep only the latest `trim_data_seconds` of the recording.
    #[serde(default)]
    pub trim_data_seconds: Option<f64>,
}

/// Record until `Capture::stop()` is called (looping mode in the UI).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualCaptureMode {
    #[serde(default)]
    pub trim_data_seconds: Option<f64>,
}

/// How a capture ends.  See the module docs.
///
/// In YAML the variant is a single-key map (`timed: { duration_seconds: 1 }`),
/// which serde_yaml only reads through `serde_yaml::with::singleton_map`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Manual(ManualCaptureMode),
    Timed(TimedCaptureMode),
    DigitalTrigger(DigitalTriggerCaptureMode),
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::Manual(ManualCaptureMode::default())
    }
}

impl CaptureMode {
    /// `true` if the capture only ends via `stop()`.
    pub fn is_manual(&self) -> bool {
        matches!(self, CaptureMode::Manual(_))
    }
}

impl From<&CaptureMode> for capture_configuration::CaptureMode {
    fn from(mode: &CaptureMode) -> Self {
        match mode {
            CaptureMode::Manual(m) => {
                capture_configuration::CaptureMode::ManualCaptureMode(pb::ManualCaptureMode {
                    trim_data_seconds: m.trim_data_seconds.unwrap_or_default(),
                })
            }
            CaptureMode::Timed(m) => {
                capture_configuration::CaptureMode::TimedCaptureMode(pb::TimedCaptureMode {
                    duration_seconds: m.duration_seconds,
                    trim_data_seconds: m.trim_data_seconds.unwrap_or_default(),
                })
            }
            CaptureMode::DigitalTrigger(m) => {
                let mut out = pb::DigitalTriggerCaptureMode {
                    trigger_channel_index: m.trigger_channel_index,
                    min_pulse_width_seconds: m.min_pulse_width_seconds.unwrap_or_default(),
                    max_pulse_width_seconds: m.max_pulse_width_seconds.unwrap_or_default(),
                    trim_data_seconds: m.trim_data_seconds.unwrap_or_default(),
                    after_trigger_seconds: m.after_trigger_seconds.unwrap_or_default(),
                    ..Default::default()
                };
                out.set_trigger_type(m.trigger_type.to_proto());
                out.linked_channels = m
                    .linked_channels
                    .iter()
                    .map(|lc| {
                        let mut ch = pb::DigitalTriggerLinkedChannel {
                            channel_index: lc.channel_index,
                            ..Default::default()
                        };
                        ch.set_state(lc.state.to_proto());
                        ch
                    })
                    .collect();
                capture_configuration::CaptureMode::DigitalCaptureMode(out)
            }
        }
    }
}

// ── CaptureConfiguration ──────────────────────────────────────────────────────

/// Top-level capture settings passed to `start_capture()`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfiguration {
    /// Capture buffer size in megabytes.  `None` (or zero) keeps the Logic 2
    /// default.
    pub buffer_size_megabytes: Option<u32>,

    pub capture_mode: CaptureMode,
}

impl From<&CaptureConfiguration> for pb::CaptureConfiguration {
    fn from(cfg: &CaptureConfiguration) -> Self {
        Self {
            buffer_size_megabytes: cfg.buffer_size_megabytes.unwrap_or_default(),
            capture_mode: Some((&cfg.capture_mode).into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_manual_without_buffer_size() {
        let out = pb::CaptureConfiguration::from(&CaptureConfiguration::default());
        assert_eq!(out.buffer_size_megabytes, 0);
        assert!(matches!(
            out.capture_mode,
            Some(capture_configuration::CaptureMode::ManualCaptureMode(ref m)) if m.trim_data_seconds == 0.0
        ));
    }

    #[test]
    fn timed_mode_to_proto() {
        let cfg = CaptureConfiguration {
            buffer_size_megabytes: Some(512),
            capture_mode: CaptureMode::Timed(TimedCaptureMode {
                duration_seconds: 5.0,
                trim_data_seconds: Some(1.5),
            }),
        };
        let out = pb::CaptureConfiguration::from(&cfg);
        assert_eq!(out.buffer_size_megabytes, 512);
        match out.capture_mode {
            Some(capture_configuration::CaptureMode::TimedCaptureMode(m)) => {
                assert_eq!(m.duration_seconds, 5.0);
                assert_eq!(m.trim_data_seconds, 1.5);
            }
            other => panic!("unexpected capture mode: {other:?}"),
        }
    }

    #[test]
    fn digital_trigger_mode_to_proto() {
        let mut mode = DigitalTriggerCaptureMode::new(DigitalTriggerType::PulseLow, 4);
        mode.min_pulse_width_seconds = Some(1e-9);
        mode.max_pulse_width_seconds = Some(0.5);
        mode.after_trigger_seconds = Some(0.25);
        mode.linked_channels.push(DigitalTriggerLinkedChannel {
            channel_index: 5,
            state: DigitalTriggerLinkedChannelState::High,
        });

        let out = capture_configuration::CaptureMode::from(&CaptureMode::DigitalTrigger(mode));
        match out {
            capture_configuration::CaptureMode::DigitalCaptureMode(m) => {
                assert_eq!(m.trigger_type(), pb::DigitalTriggerType::PulseLow);
                assert_eq!(m.trigger_channel_index, 4);
                assert_eq!(m.min_pulse_width_seconds, 1e-9);
                assert_eq!(m.max_pulse_width_seconds, 0.5);
                assert_eq!(m.after_trigger_seconds, 0.25);
                assert_eq!(m.trim_data_seconds, 0.0);
                assert_eq!(m.linked_channels.len(), 1);
                assert_eq!(
                    m.linked_channels[0].state(),
                    pb::DigitalTriggerLinkedChannelState::High
                );
            }
            other => panic!("unexpected capture mode: {other:?}"),
        }
    }

    fn mode_from_yaml(yaml: &str) -> Result<CaptureMode, serde_yaml::Error> {
        serde_yaml::with::singleton_map::deserialize(serde_yaml::Deserializer::from_str(yaml))
    }

    #[test]
    fn capture_mode_yaml_uses_snake_case_tags() {
        let mode = mode_from_yaml("digital_trigger:\n  trigger_type: rising\n  trigger_channel_index: 3\n")
            .unwrap();
        assert_eq!(
            mode,
            CaptureMode::DigitalTrigger(DigitalTriggerCaptureMode::new(
                DigitalTriggerType::Rising,
                3
            ))
        );
        assert!(!mode.is_manual());

        let mode = mode_from_yaml("manual: {}\n").unwrap();
        assert!(mode.is_manual());

        let mode = mode_from_yaml("timed:\n  duration_seconds: 2.5\n").unwrap();
        assert_eq!(
            mode,
            CaptureMode::Timed(TimedCaptureMode {
                duration_seconds: 2.5,
                trim_data_seconds: None,
            })
        );
    }

    #[test]
    fn capture_mode_yaml_rejects_misspelled_fields() {
        let err = mode_from_yaml("timed:\n  duration_seconds: 1.0\n  trim_data_second: 0.5\n")
            .unwrap_err();
        assert!(err.to_string().contains("trim_data_second"), "{err}");

        let err = mode_from_yaml(
            "digital_trigger:\n  trigger_type: falling\n  trigger_channel_index: 0\n  linked_channels:\n    - channel_index: 1\n      stat: high\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("stat"), "{err}");
    }

    #[test]
    fn zero_buffer_size_is_sent_as_unset() {
        let cfg = CaptureConfiguration {
            buffer_size_megabytes: Some(0),
            ..Default::default()
        };
        let out = pb::CaptureConfiguration::from(&cfg);
        assert_eq!(out.buffer_size_megabytes, 0);
        assert_eq!(out, pb::CaptureConfiguration::from(&CaptureConfiguration::default()));
    }

    #[test]
    fn pulse_types() {
        assert!(DigitalTriggerType::PulseHigh.is_pulse());
        assert!(DigitalTriggerType::PulseLow.is_pulse());
        assert!(!DigitalTriggerType::Rising.is_pulse());
    }
}
