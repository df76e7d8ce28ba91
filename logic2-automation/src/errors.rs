/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the Logic 2 automation client.
//!
//! Logic 2 reports application-level failures as a gRPC `ABORTED` status
//! whose message has the form `"<code>: <message>"`, where `<code>` is an
//! [`ErrorCode`] value.  [`SaleaeError::from_status`] decodes that format into
//! one typed variant per error code.  Any other status code is passed through
//! untouched as [`SaleaeError::Rpc`].
//!
//! | `ErrorCode` | Variant |
//! |---|---|
//! | `UNSPECIFIED` | `Unknown` |
//! | `INTERNAL_EXCEPTION` | `InternalServer` |
//! | `INVALID_REQUEST` | `InvalidRequest` |
//! | `LOAD_CAPTURE_FAILED` | `LoadCaptureFailed` |
//! | `EXPORT_FAILED` | `Export` |
//! | `MISSING_DEVICE` | `MissingDevice` |
//! | `DEVICE_ERROR` | `Device` |
//! | `OUT_OF_MEMORY` | `OutOfMemory` |

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tonic::{Code, Status};

use crate::models::Version;
use crate::proto::saleae_automation::ErrorCode;

/// `"<code>: <message>"` as embedded in `ABORTED` status messages.
static ERROR_MESSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+): (.*)$").expect("error message pattern is valid"));

/// Convenience alias used throughout the client.
pub type Result<T, E = SaleaeError> = std::result::Result<T, E>;

// ── SaleaeError ───────────────────────────────────────────────────────────────

/// Every failure the automation client can report.
///
/// [`Device`](SaleaeError::Device) and [`OutOfMemory`](SaleaeError::OutOfMemory)
/// are capture failures; see [`is_capture_error`](SaleaeError::is_capture_error).
/// Automation scripts should handle those and start a new capture rather than
/// save or export the failed one.
#[derive(Debug, Error)]
pub enum SaleaeError {
    /// The server's error message was not understood.  Usually indicates a
    /// version mismatch between this client and Logic 2.
    #[error("unknown error: {0}")]
    Unknown(String),

    /// `launch()` started a Logic 2 process, but a different, already running
    /// instance answered on the automation port.
    #[error("another instance of Logic 2 is already running (expected pid {expected_pid}, server reported pid {actual_pid})")]
    Logic2AlreadyRunning { expected_pid: u32, actual_pid: u64 },

    /// The server speaks a different major version of the automation API.
    #[error("incompatible automation API version: server={server}, supported major version={supported_major}")]
    IncompatibleApiVersion { server: Version, supported_major: u32 },

    /// An unexpected error occurred inside Logic 2.
    #[error("internal server error: {0}")]
    InternalServer(String),

    /// The request was rejected as invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A saved capture could not be loaded (missing file, newer format, or
    /// not a capture file).
    #[error("failed to load capture: {0}")]
    LoadCaptureFailed(String),

    /// Raw data, analyzer or data table export failed.
    #[error("export failed: {0}")]
    Export(String),

    /// The requested device is not attached or has not been detected.
    #[error("missing device: {0}")]
    MissingDevice(String),

    /// Device failure while capturing (USB, bandwidth, calibration,
    /// disconnection).
    #[error("device error: {0}")]
    Device(String),

    /// The capture was terminated because the capture buffer filled up.
    #[error("capture ran out of memory: {0}")]
    OutOfMemory(String),

    /// Any non-`ABORTED` gRPC failure, e.g. `UNAVAILABLE` when nothing is
    /// listening on the automation port.
    #[error("gRPC call failed: {0}")]
    Rpc(Status),

    /// The endpoint URI or channel could not be built.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The Logic 2 binary could not be located or started.
    #[error("failed to launch Logic 2: {0}")]
    Launch(String),

    /// Spawning or terminating the Logic 2 process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SaleaeError {
    /// Map a gRPC status returned by Logic 2 to a typed error.
    pub fn from_status(status: Status) -> Self {
        if status.code() == Code::Aborted {
            Self::from_message(status.message())
        } else {
            SaleaeError::Rpc(status)
        }
    }

    /// Decode an `ABORTED` status message of the form `"<code>: <message>"`.
    ///
    /// Messages that do not follow the format, and codes this client does not
    /// know, become [`SaleaeError::Unknown`].
    pub fn from_message(message: &str) -> Self {
        let Some(caps) = ERROR_MESSAGE_RE.captures(message) else {
            return SaleaeError::Unknown(message.to_string());
        };

        let detail = caps[2].to_string();
        let code = caps[1]
            .parse::<i32>()
            .ok()
            .and_then(|c| ErrorCode::try_from(c).ok());

        match code {
            Some(code) => Self::from_error_code(code, detail),
            None => SaleaeError::Unknown(detail),
        }
    }

    /// The variant for a known [`ErrorCode`].
    pub fn from_error_code(code: ErrorCode, detail: String) -> Self {
        match code {
            ErrorCode::Unspecified => SaleaeError::Unknown(detail),
            ErrorCode::InternalException => SaleaeError::InternalServer(detail),
            ErrorCode::InvalidRequest => SaleaeError::InvalidRequest(detail),
            ErrorCode::LoadCaptureFailed => SaleaeError::LoadCaptureFailed(detail),
            ErrorCode::ExportFailed => SaleaeError::Export(detail),
            ErrorCode::MissingDevice => SaleaeError::MissingDevice(detail),
            ErrorCode::DeviceError => SaleaeError::Device(detail),
            ErrorCode::OutOfMemory => SaleaeError::OutOfMemory(detail),
        }
    }

    /// `true` for failures that happened while recording.
    pub fn is_capture_error(&self) -> bool {
        matches!(self, SaleaeError::Device(_) | SaleaeError::OutOfMemory(_))
    }

    /// `true` when the status indicates nothing is reachable at the endpoint
    /// yet.  The connect loop keeps retrying while this holds.
    pub(crate) fn is_unavailable(&self) -> bool {
        matches!(self, SaleaeError::Rpc(status) if status.code() == Code::Unavailable)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ERROR_CODES: [ErrorCode; 8] = [
        ErrorCode::Unspecified,
        ErrorCode::InternalException,
        ErrorCode::InvalidRequest,
        ErrorCode::LoadCaptureFailed,
        ErrorCode::ExportFailed,
        ErrorCode::MissingDevice,
        ErrorCode::DeviceError,
        ErrorCode::OutOfMemory,
    ];

    fn aborted(code: ErrorCode, msg: &str) -> Status {
        Status::aborted(format!("{}: {}", code as i32, msg))
    }

    #[test]
    fn aborted_status_maps_to_typed_variant() {
        let err = SaleaeError::from_status(aborted(ErrorCode::InvalidRequest, "bad channel"));
        match err {
            SaleaeError::InvalidRequest(msg) => assert_eq!(msg, "bad channel"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = SaleaeError::from_status(aborted(ErrorCode::MissingDevice, "F4241"));
        assert!(matches!(err, SaleaeError::MissingDevice(ref m) if m == "F4241"));
    }

    #[test]
    fn every_error_code_has_a_variant() {
        for code in ALL_ERROR_CODES {
            let err = SaleaeError::from_status(aborted(code, "x"));
            assert!(
                !matches!(err, SaleaeError::Rpc(_)),
                "{code:?} fell through to Rpc"
            );
        }
    }

    #[test]
    fn capture_errors_are_flagged() {
        assert!(SaleaeError::from_error_code(ErrorCode::DeviceError, String::new()).is_capture_error());
        assert!(SaleaeError::from_error_code(ErrorCode::OutOfMemory, String::new()).is_capture_error());
        assert!(!SaleaeError::from_error_code(ErrorCode::ExportFailed, String::new()).is_capture_error());
    }

    #[test]
    fn unparseable_message_is_unknown() {
        let err = SaleaeError::from_status(Status::aborted("something went wrong"));
        assert!(matches!(err, SaleaeError::Unknown(ref m) if m == "something went wrong"));
    }

    #[test]
    fn unknown_code_is_unknown_with_detail() {
        let err = SaleaeError::from_message("9999: from the future");
        assert!(matches!(err, SaleaeError::Unknown(ref m) if m == "from the future"));
    }

    #[test]
    fn message_keeps_colons_after_the_code() {
        let err = SaleaeError::from_message("21: export failed: disk full");
        assert!(matches!(err, SaleaeError::Export(ref m) if m == "export failed: disk full"));
    }

    #[test]
    fn non_aborted_status_passes_through() {
        let err = SaleaeError::from_status(Status::unavailable("connection refused"));
        assert!(err.is_unavailable());
        match err {
            SaleaeError::Rpc(status) => assert_eq!(status.code(), Code::Unavailable),
            other => panic!("unexpected error: {other:?}"),
        }

        // Even a well-formed message is not decoded unless the code is ABORTED
        let err = SaleaeError::from_status(Status::internal("10: nope"));
        assert!(matches!(err, SaleaeError::Rpc(_)));
    }
}
