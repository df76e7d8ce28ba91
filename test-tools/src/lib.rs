/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Test tooling for the Logic 2 automation client.  NOT for production.
//!
//! [`SimulatedLogic2`] answers the automation API the way Logic 2 does with
//! simulation devices attached.  [`spawn_simulator`] serves it on a random
//! local port for in-process tests; the `logic2-sim` binary serves it on a
//! fixed port for manual testing and `Manager::launch()`.

pub mod simulator;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use logic2_automation::manager::ConnectOptions;
use logic2_automation::proto::saleae_automation::manager_server::ManagerServer;

pub use simulator::{SimulatedLogic2, SimulatorOptions};

/// A simulator serving in the background.  The server task is aborted on
/// drop.
pub struct RunningSimulator {
    pub addr: SocketAddr,
    pub service: SimulatedLogic2,
    handle: JoinHandle<()>,
}

impl RunningSimulator {
    /// Options that connect a `Manager` to this simulator.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            address: self.addr.ip().to_string(),
            port: self.addr.port(),
            connect_timeout: None,
        }
    }
}

impl Drop for RunningSimulator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `service` on `addr`.  Pass port 0 to pick a free port.
pub async fn spawn_simulator(service: SimulatedLogic2, addr: SocketAddr) -> Result<RunningSimulator> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind simulator to {addr}"))?;
    let addr = listener.local_addr()?;
    let incoming = TcpListenerStream::new(listener);

    let server = Server::builder().add_service(ManagerServer::new(service.clone()));
    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve_with_incoming(incoming).await {
            error!("Simulator server stopped: {}", e);
        }
    });

    info!(%addr, "Simulated Logic 2 listening");
    Ok(RunningSimulator {
        addr,
        service,
        handle,
    })
}

/// Serve `service` on `addr` until the process is stopped.
pub async fn serve(service: SimulatedLogic2, addr: SocketAddr) -> Result<()> {
    info!(%addr, "Simulated Logic 2 listening");
    Server::builder()
        .add_service(ManagerServer::new(service))
        .serve(addr)
        .await
        .with_context(|| format!("Simulator server on {addr} failed"))
}
