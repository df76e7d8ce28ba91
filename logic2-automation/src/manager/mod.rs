/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Connection to a running Logic 2 instance.
//!
//! [`Manager`] owns the gRPC channel (and, when created with
//! [`Manager::launch`], the Logic 2 process itself).  Captures created through
//! it share the same channel.
//!
//! # Example
//! ```rust,ignore
//! let manager = Manager::connect(ConnectOptions::default()).await?;
//! let mut capture = manager
//!     .start_capture(&device_config.into(), Some("F4241"), Some(&capture_config))
//!     .await?;
//! capture.wait().await?;
//! capture.save_capture("/tmp/example.sal").await?;
//! capture.close().await?;
//! manager.close().await;
//! ```

pub mod launch;

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tonic::transport::{Channel, Endpoint};
use tracing::{debug, error, info, warn};

use crate::capture::Capture;
use crate::errors::{Result, SaleaeError};
use crate::models::{AppInfo, CaptureConfiguration, DeviceConfiguration, DeviceDesc};
use crate::proto::saleae_automation as pb;
use crate::proto::saleae_automation::manager_client::ManagerClient;
use crate::proto::THIS_API_VERSION_MAJOR;

use launch::Logic2Process;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Address Logic 2 listens on.  The automation server is local-only by default.
pub const DEFAULT_GRPC_ADDRESS: &str = "127.0.0.1";

/// Port Logic 2 uses for the automation server unless told otherwise.
pub const DEFAULT_GRPC_PORT: u16 = 10430;

/// How long [`Manager::connect`] keeps retrying while the server is unreachable.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Delay between connection attempts.
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// How long `close()` waits for a launched Logic 2 process to exit.
const PROCESS_EXIT_TIMEOUT: Duration = Duration::from_secs(2);

// ── Options ───────────────────────────────────────────────────────────────────

/// Where and how long to try connecting to an existing Logic 2 instance.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub address: String,
    pub port: u16,
    /// `None` uses [`DEFAULT_CONNECT_TIMEOUT`].
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_GRPC_ADDRESS.to_string(),
            port: DEFAULT_GRPC_PORT,
            connect_timeout: None,
        }
    }
}

impl ConnectOptions {
    /// `http://address:port`, the form tonic expects.
    pub fn endpoint_uri(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

/// How to start a local Logic 2 instance.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Logic 2 binary.  Required on Linux and macOS.
    pub application_path: Option<PathBuf>,
    /// `None` uses [`DEFAULT_GRPC_PORT`].
    pub port: Option<u16>,
    /// `None` uses [`DEFAULT_CONNECT_TIMEOUT`].
    pub connect_timeout: Option<Duration>,
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// Entry point for automating Logic 2.
///
/// Prefer [`Manager::connect`] or [`Manager::launch`].
/// [`Manager::from_endpoint`] exists for callers who need custom channel
/// settings (keep-alive, message size limits, TLS).
pub struct Manager {
    client: ManagerClient<Channel>,
    logic2_process: Option<Logic2Process>,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("launched_pid", &self.logic2_process.as_ref().map(|p| p.pid))
            .finish()
    }
}

impl Manager {
    /// Connect to an already running Logic 2 instance.
    ///
    /// Retries while the server is unreachable, up to the connect timeout.
    ///
    /// # Errors
    /// * [`SaleaeError::IncompatibleApiVersion`] if the server's API major
    ///   version differs from this client's.
    /// * [`SaleaeError::Rpc`] with `UNAVAILABLE` if nothing answered in time.
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        let endpoint = Endpoint::from_shared(options.endpoint_uri())?;
        info!(endpoint = %options.endpoint_uri(), "Connecting to Logic 2");
        Self::connect_inner(endpoint, options.connect_timeout, None).await
    }

    /// Connect through a caller-configured endpoint.
    pub async fn from_endpoint(endpoint: Endpoint, connect_timeout: Option<Duration>) -> Result<Self> {
        Self::connect_inner(endpoint, connect_timeout, None).await
    }

    /// Launch Logic 2 with the automation server enabled and connect to it.
    ///
    /// The process is shut down by [`Manager::close`] (or when the manager is
    /// dropped).
    ///
    /// # Errors
    /// * [`SaleaeError::Launch`] if the binary cannot be located.
    /// * [`SaleaeError::Logic2AlreadyRunning`] if a different instance was
    ///   already serving the port.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let logic2_bin = launch::find_application(options.application_path.as_deref())?;
        let port = options.port.unwrap_or(DEFAULT_GRPC_PORT);

        let process = launch::spawn(&logic2_bin, port)?;

        let connect = ConnectOptions {
            address: DEFAULT_GRPC_ADDRESS.to_string(),
            port,
            connect_timeout: options.connect_timeout,
        };
        let endpoint = Endpoint::from_shared(connect.endpoint_uri())?;
        Self::connect_inner(endpoint, connect.connect_timeout, Some(process)).await
    }

    async fn connect_inner(
        endpoint: Endpoint,
        connect_timeout: Option<Duration>,
        logic2_process: Option<Logic2Process>,
    ) -> Result<Self> {
        // Lazy: a missing server surfaces as UNAVAILABLE on the first call,
        // which the retry loop below understands.
        let client = ManagerClient::new(endpoint.connect_lazy());
        let mut manager = Self {
            client,
            logic2_process,
        };

        let timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match manager.get_app_info().await {
                Ok(app_info) => {
                    if let Err(e) = manager.check_app_info(&app_info) {
                        manager.shutdown_process().await;
                        return Err(e);
                    }
                    info!(
                        app_version = %app_info.app_version,
                        api_version = %app_info.api_version,
                        app_pid = app_info.app_pid,
                        attempts,
                        "Connected to Logic 2"
                    );
                    return Ok(manager);
                }
                Err(e) if e.is_unavailable() && start.elapsed() < timeout => {
                    debug!(attempts, "Logic 2 not reachable yet, retrying");
                    tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                }
                Err(e) => {
                    warn!(attempts, error = %e, "Giving up connecting to Logic 2");
                    manager.shutdown_process().await;
                    return Err(e);
                }
            }
        }
    }

    /// Reject servers this client cannot talk to.
    fn check_app_info(&self, app_info: &AppInfo) -> Result<()> {
        if let Some(process) = &self.logic2_process {
            if u64::from(process.pid) != app_info.app_pid {
                return Err(SaleaeError::Logic2AlreadyRunning {
                    expected_pid: process.pid,
                    actual_pid: app_info.app_pid,
                });
            }
        }

        if app_info.api_version.major != THIS_API_VERSION_MAJOR {
            error!(
                supported_major = THIS_API_VERSION_MAJOR,
                server_version = %app_info.api_version,
                "Incompatible Saleae Automation API version encountered"
            );
            return Err(SaleaeError::IncompatibleApiVersion {
                server: app_info.api_version,
                supported_major: THIS_API_VERSION_MAJOR,
            });
        }

        Ok(())
    }

    /// PID of the Logic 2 process started by [`Manager::launch`], if any.
    pub fn launched_pid(&self) -> Option<u32> {
        self.logic2_process.as_ref().map(|p| p.pid)
    }

    // ── RPCs ──────────────────────────────────────────────────────────────────

    /// Information about the connected Logic 2 instance.
    pub async fn get_app_info(&self) -> Result<AppInfo> {
        let reply = self
            .client
            .clone()
            .get_app_info(pb::GetAppInfoRequest {})
            .await
            .map_err(SaleaeError::from_status)?
            .into_inner();

        Ok(reply.app_info.map(AppInfo::from).unwrap_or_else(|| AppInfo {
            api_version: Default::default(),
            app_version: String::new(),
            app_pid: 0,
        }))
    }

    /// Devices known to Logic 2.  Simulation devices are only listed when
    /// `include_simulation_devices` is set.
    pub async fn get_devices(&self, include_simulation_devices: bool) -> Result<Vec<DeviceDesc>> {
        let reply = self
            .client
            .clone()
            .get_devices(pb::GetDevicesRequest {
                include_simulation_devices,
            })
            .await
            .map_err(SaleaeError::from_status)?
            .into_inner();

        let devices: Vec<DeviceDesc> = reply.devices.into_iter().map(DeviceDesc::from).collect();
        debug!(count = devices.len(), include_simulation_devices, "Devices listed");
        Ok(devices)
    }

    /// Start a new capture.
    ///
    /// Every setting comes from the arguments; whatever is currently selected
    /// in the Logic 2 UI is ignored.  `device_id = None` lets Logic 2 pick
    /// the device.  `capture_configuration = None` means manual mode.
    ///
    /// The returned capture is still recording: call `wait()` or `stop()`
    /// before anything else.
    pub async fn start_capture(
        &self,
        device_configuration: &DeviceConfiguration,
        device_id: Option<&str>,
        capture_configuration: Option<&CaptureConfiguration>,
    ) -> Result<Capture> {
        let request = pb::StartCaptureRequest {
            device_id: device_id.unwrap_or_default().to_string(),
            device_configuration: Some(device_configuration.into()),
            capture_configuration: capture_configuration.map(pb::CaptureConfiguration::from),
        };

        let reply = self
            .client
            .clone()
            .start_capture(request)
            .await
            .map_err(SaleaeError::from_status)?
            .into_inner();

        let capture_id = reply.capture_info.map(|c| c.capture_id).unwrap_or_default();
        info!(capture_id, device_id = ?device_id, "Capture started");
        Ok(Capture::new(self.client.clone(), capture_id, true))
    }

    /// Load a `.sal` capture file.  The capture is ready for analysis and
    /// export immediately.
    pub async fn load_capture(&self, filepath: &str) -> Result<Capture> {
        let reply = self
            .client
            .clone()
            .load_capture(pb::LoadCaptureRequest {
                filepath: filepath.to_string(),
            })
            .await
            .map_err(SaleaeError::from_status)?
            .into_inner();

        let capture_id = reply.capture_info.map(|c| c.capture_id).unwrap_or_default();
        info!(capture_id, filepath, "Capture loaded");
        Ok(Capture::new(self.client.clone(), capture_id, false))
    }

    /// Close the connection and shut down Logic 2 if this manager launched it.
    pub async fn close(mut self) {
        self.shutdown_process().await;
        debug!("Manager closed");
    }

    async fn shutdown_process(&mut self) {
        let Some(mut process) = self.logic2_process.take() else {
            return;
        };

        info!(pid = process.pid, "Shutting down Logic 2");
        if let Err(e) = process.child.start_kill() {
            debug!(pid = process.pid, error = %e, "Logic 2 already exited");
        }
        match tokio::time::timeout(PROCESS_EXIT_TIMEOUT, process.child.wait()).await {
            Ok(Ok(status)) => debug!(pid = process.pid, %status, "Logic 2 exited"),
            Ok(Err(e)) => warn!(pid = process.pid, error = %e, "Failed to reap Logic 2"),
            Err(_) => warn!(pid = process.pid, "Logic 2 did not exit in time"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
