/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use logic2_automation::config::CaptureJob;
use logic2_automation::job::run_job;
use logic2_automation::manager::{ConnectOptions, LaunchOptions, Manager};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Automate a Saleae Logic 2 instance over its gRPC automation API.
///
/// Example:
///   logic2-automation --port 10430 devices --simulation
///   logic2-automation run --job capture_job.yaml
#[derive(Debug, Parser)]
#[command(
    name = "logic2-automation",
    about = "Saleae Logic 2 automation client",
    long_about = None,
)]
struct Cli {
    /// Address of the Logic 2 automation server [default: job file, then 127.0.0.1].
    #[arg(short = 'a', long = "address", global = true)]
    address: Option<String>,

    /// Port of the Logic 2 automation server [default: job file, then 10430].
    #[arg(short = 'p', long = "port", global = true)]
    port: Option<u16>,

    /// Seconds to keep retrying while Logic 2 is not reachable.
    #[arg(short = 't', long = "connect-timeout", global = true)]
    connect_timeout: Option<f64>,

    /// Launch this Logic 2 binary instead of connecting to a running instance.
    #[arg(short = 'l', long = "launch", global = true)]
    launch: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print Logic 2 application and API version.
    Info,

    /// List connected devices.
    Devices {
        /// Include simulation devices.
        #[arg(short = 's', long = "simulation", default_value_t = false)]
        simulation: bool,
    },

    /// Run a YAML capture job.  Connection settings in the job file are
    /// used unless overridden on the command line.
    Run {
        /// Path to the capture job file.
        #[arg(short = 'j', long = "job")]
        job: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        address = ?cli.address,
        port = ?cli.port,
        connect_timeout = ?cli.connect_timeout,
        launch = ?cli.launch,
        "Configuration"
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let connect_timeout = cli
        .connect_timeout
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--connect-timeout must be a non-negative number of seconds")?;

    // The job file is read before connecting so a bad file fails fast.
    let job = match &cli.command {
        Command::Run { job } => Some(CaptureJob::load_from_file(job)?),
        _ => None,
    };

    let connect = resolve_connect_options(&cli, connect_timeout, job.as_ref());
    info!(endpoint = %connect.endpoint_uri(), "Resolved connection");

    let manager = match &cli.launch {
        Some(path) => Manager::launch(LaunchOptions {
            application_path: Some(path.clone()),
            port: Some(connect.port),
            connect_timeout: connect.connect_timeout,
        })
        .await
        .context("Failed to launch Logic 2")?,
        None => Manager::connect(connect)
            .await
            .context("Failed to connect to Logic 2")?,
    };

    let result = dispatch(&manager, &cli.command, job.as_ref()).await;
    manager.close().await;
    result
}

/// Each setting comes from the flag if given, else the job file, else the
/// built-in default.
fn resolve_connect_options(
    cli: &Cli,
    connect_timeout: Option<Duration>,
    job: Option<&CaptureJob>,
) -> ConnectOptions {
    let base = job
        .map(|j| ConnectOptions::from(&j.connection))
        .unwrap_or_default();
    ConnectOptions {
        address: cli.address.clone().unwrap_or(base.address),
        port: cli.port.unwrap_or(base.port),
        connect_timeout: connect_timeout.or(base.connect_timeout),
    }
}

async fn dispatch(manager: &Manager, command: &Command, job: Option<&CaptureJob>) -> Result<()> {
    match command {
        Command::Info => {
            let app_info = manager.get_app_info().await?;
            println!("Logic 2 version: {}", app_info.app_version);
            println!("API version:     {}", app_info.api_version);
            println!("PID:             {}", app_info.app_pid);
        }
        Command::Devices { simulation } => {
            let devices = manager.get_devices(*simulation).await?;
            if devices.is_empty() {
                println!("No devices found");
            }
            for device in devices {
                println!(
                    "{:<20} {:<14}{}",
                    device.device_id,
                    device.device_type.display_name(),
                    if device.is_simulation { " (simulation)" } else { "" }
                );
            }
        }
        Command::Run { .. } => {
            let job = job.context("capture job not loaded")?;
            let report = run_job(manager, job).await?;
            println!("Capture {} finished", report.capture_id);
            for (name, handle) in &report.analyzers {
                println!("  analyzer {name}: id {}", handle.analyzer_id);
            }
            let outputs = [
                ("raw csv", &report.raw_csv_directory),
                ("raw binary", &report.raw_binary_directory),
                ("data table", &report.data_table),
                ("capture", &report.saved_capture),
            ];
            for (what, path) in outputs {
                if let Some(path) = path {
                    println!("  {what}: {}", path.display());
                }
            }
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use logic2_automation::manager::{DEFAULT_GRPC_ADDRESS, DEFAULT_GRPC_PORT};

    const JOB: &str = r#"
connection:
  address: 10.0.0.5
  port: 10500
  connect_timeout_seconds: 5
device:
  enabled_digital_channels: [0]
manual_stop_after_seconds: 1
"#;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("logic2-automation").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_default_without_job() {
        let opts = resolve_connect_options(&cli(&["info"]), None, None);
        assert_eq!(opts.address, DEFAULT_GRPC_ADDRESS);
        assert_eq!(opts.port, DEFAULT_GRPC_PORT);
        assert_eq!(opts.connect_timeout, None);
    }

    #[test]
    fn job_connection_fills_unset_flags() {
        let job = CaptureJob::from_yaml(JOB).unwrap();
        let opts = resolve_connect_options(&cli(&["run", "--job", "job.yaml"]), None, Some(&job));
        assert_eq!(opts.endpoint_uri(), "http://10.0.0.5:10500");
        assert_eq!(opts.connect_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn explicit_default_flags_override_job() {
        let job = CaptureJob::from_yaml(JOB).unwrap();
        let args = cli(&["--address", "127.0.0.1", "--port", "10430", "run", "--job", "job.yaml"]);
        let opts = resolve_connect_options(&args, Some(Duration::from_secs(1)), Some(&job));
        assert_eq!(opts.address, DEFAULT_GRPC_ADDRESS);
        assert_eq!(opts.port, DEFAULT_GRPC_PORT);
        assert_eq!(opts.connect_timeout, Some(Duration::from_secs(1)));
    }
}
