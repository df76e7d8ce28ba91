/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulated Logic 2 automation server.
//!
//! Accepts the same `--automation --automationPort <port>` arguments as
//! Logic 2, so it can stand in for the real application with
//! `Manager::launch()` and `logic2-automation --launch`.
//!
//! Example:
//!   logic2-sim --port 10430
//!   logic2-automation devices --simulation

use std::net::{Ipv4Addr, SocketAddr};
use std::process;

use clap::Parser;
use tracing::{error, info};

use test_tools::{serve, SimulatedLogic2, SimulatorOptions};

#[derive(Debug, Parser)]
#[command(
    name = "logic2-sim",
    about = "Simulated Logic 2 automation server (testing only)",
    long_about = None,
)]
struct Cli {
    /// Port to serve the automation API on.
    #[arg(short = 'p', long = "port", alias = "automationPort", default_value_t = 10430)]
    port: u16,

    /// PID to report in GetAppInfo.  Defaults to this process's PID.
    #[arg(long = "pid")]
    pid: Option<u64>,

    /// Accepted for command-line compatibility with Logic 2.
    #[arg(long = "automation", default_value_t = false)]
    automation: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut options = SimulatorOptions::default();
    if let Some(pid) = cli.pid {
        options.launch_pid = pid;
    }
    info!(
        port = cli.port,
        pid = options.launch_pid,
        automation = cli.automation,
        "logic2-sim starting up..."
    );

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, cli.port));
    if let Err(e) = serve(SimulatedLogic2::new(options), addr).await {
        error!("{:#}", e);
        process::exit(1);
    }
}
