//! `motion-controller` – process entry point.
//!
//! 1. Installs the `tracing` subscriber (see `tac3d_control::telemetry`).
//! 2. Loads `~/.tac3d/motion_controller.toml` plus `TAC3D_*` overrides.
//! 3. Wires Ctrl-C / SIGTERM to the shared [`Shutdown`] signal.
//! 4. Connects to rosbridge on a multi-worker runtime, waits for the motion
//!    service, subscribes to the sensor topic and runs the motion cycle until
//!    stopped.
//!
//! Exits 0 on a requested stop, including one that arrives while still
//! waiting for the service; exits 1 on configuration or transport failure,
//! which includes losing the rosbridge connection at any point.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use tac3d_control::{Shutdown, init_tracing, run_motion_cycle};
use tac3d_middleware::RosbridgeClient;
use tac3d_types::ControlError;
use tracing::{error, info, warn};

/// Name reported to the trace collector.
const NODE_NAME: &str = "motion_controller_node";

fn main() -> ExitCode {
    // Hold the guard for the whole process so pending spans are flushed.
    let _guard = init_tracing(NODE_NAME);

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(path = %config::config_path().display(), error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(?cfg, "configuration loaded");

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("stop signal received");
        signal.trigger();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the process can only be killed");
    }

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name("tac3d-worker");
    if let Some(workers) = cfg.workers {
        builder.worker_threads(workers);
    }
    let runtime = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cfg, &shutdown)) {
        Ok(cycles) => {
            info!(cycles, "motion controller stopped");
            ExitCode::SUCCESS
        }
        Err(ControlError::Interrupted(service)) => {
            info!(service = %service, "stopped before the service became available");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "motion controller failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: &config::Config, shutdown: &Shutdown) -> Result<u64, ControlError> {
    let controller = cfg.controller();
    let client = RosbridgeClient::connect(&cfg.rosbridge_url)
        .await?
        .with_call_timeout(cfg.call_timeout())
        .with_probe_timeout(controller.poll_interval);
    run_motion_cycle(Arc::new(client), &controller, shutdown).await
}
