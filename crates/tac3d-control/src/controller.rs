//! [`MotionCycleController`] – the sense → compute → dispatch cycle.
//!
//! Two states:
//!
//! 1. **WaitingForService** – [`MotionCycleController::connect`] probes the
//!    motion service every `poll_interval` until it is ready. A shutdown
//!    signal aborts the wait with [`ControlError::Interrupted`] before any
//!    sensor subscription exists. Without a signal the wait never gives up,
//!    unless the transport itself closes.
//! 2. **Running** – [`MotionCycleController::run`] turns every sensor sample
//!    into exactly one displacement command and dispatches it without
//!    waiting for the reply.
//!
//! [`run_motion_cycle`] only reports success for a requested stop. A sample
//! stream that ends on its own means the transport went away and is an error.
//!
//! The handler only reads immutable state (epoch, trajectory, service name)
//! and bumps an atomic counter, so it is safe to call from any worker thread
//! concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tac3d_middleware::{SampleReceiver, SensorSource, ServiceClient};
use tac3d_types::{ControlError, DisplacementCommand, SensorSample};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::config::ControllerConfig;
use crate::dispatch::DispatchHandle;
use crate::shutdown::Shutdown;
use crate::trajectory::CircularTrajectory;

/// Open-loop motion controller bound to one motion service.
pub struct MotionCycleController<S: ServiceClient + ?Sized + 'static> {
    service: Arc<S>,
    service_name: Arc<str>,
    trajectory: CircularTrajectory,
    /// Captured once the service is ready; read-only afterwards.
    epoch: Instant,
    dispatched: AtomicU64,
}

impl<S: ServiceClient + ?Sized + 'static> MotionCycleController<S> {
    /// Wait for `config.service_name` to become ready, then arm the cycle.
    ///
    /// # Errors
    ///
    /// * [`ControlError::Config`] if `config` fails validation.
    /// * [`ControlError::Interrupted`] if `shutdown` fires before the service
    ///   is ready.
    /// * [`ControlError::Transport`] if the connection to the service closes
    ///   while waiting.
    #[instrument(skip_all, fields(service = %config.service_name))]
    pub async fn connect(
        service: Arc<S>,
        config: &ControllerConfig,
        shutdown: &Shutdown,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        wait_for_service(
            service.as_ref(),
            &config.service_name,
            config.poll_interval,
            shutdown,
        )
        .await?;

        info!("service available; motion cycle armed");
        Ok(Self {
            service,
            service_name: Arc::from(config.service_name.as_str()),
            trajectory: config.trajectory,
            epoch: Instant::now(),
            dispatched: AtomicU64::new(0),
        })
    }

    /// Handle one sensor sample: compute the current displacement and
    /// dispatch it.
    ///
    /// Never blocks on the service. The sample's payload is not inspected.
    pub fn on_sensor_sample(&self, sample: &SensorSample) -> DispatchHandle {
        let command = self.displacement_now();
        info!(
            sample = %sample.id,
            dx = command.dx,
            dy = command.dy,
            "dx: {:.6}, dy: {:.6}",
            command.dx,
            command.dy
        );
        self.send_command(command)
    }

    /// Issue `command` to the motion service without waiting for it.
    ///
    /// Overlapping requests are allowed and may complete in any order.
    pub fn send_command(&self, command: DisplacementCommand) -> DispatchHandle {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        DispatchHandle::spawn(
            Arc::clone(&self.service),
            Arc::clone(&self.service_name),
            command,
        )
    }

    /// Consume `samples` until the stream closes or `shutdown` fires.
    ///
    /// Returns the number of cycles run. In-flight dispatches are not
    /// awaited.
    pub async fn run(&self, mut samples: SampleReceiver, shutdown: &Shutdown) -> u64 {
        let topic = samples.topic().to_string();
        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!(cycles, "shutdown requested; leaving motion cycle");
                    break;
                }
                received = samples.recv() => match received {
                    Ok(sample) => {
                        self.on_sensor_sample(&sample).detach();
                        cycles += 1;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(topic = %topic, skipped, "sensor subscription lagged");
                    }
                    Err(RecvError::Closed) => {
                        info!(topic = %topic, cycles, "sensor stream closed");
                        break;
                    }
                },
            }
        }
        cycles
    }

    /// Displacement for the current instant.
    pub fn displacement_now(&self) -> DisplacementCommand {
        self.trajectory.displacement_at(self.elapsed())
    }

    /// Time since the cycle was armed.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Number of commands dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}

/// Probe `service_name` every `interval` until it reports ready.
///
/// A failed probe counts as "not ready" while the transport is still open.
/// Once [`ServiceClient::is_closed`] reports the connection gone, the probe's
/// error is returned. Returns [`ControlError::Interrupted`] once `shutdown`
/// has fired and the latest probe was unsuccessful; otherwise waits
/// indefinitely.
pub async fn wait_for_service<S: ServiceClient + ?Sized>(
    service: &S,
    service_name: &str,
    interval: Duration,
    shutdown: &Shutdown,
) -> Result<(), ControlError> {
    loop {
        match service.is_service_ready(service_name).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) if service.is_closed() => {
                error!(service = service_name, error = %e, "connection lost while waiting for the service");
                return Err(match e {
                    ControlError::Transport(_) => e,
                    other => ControlError::Transport(format!(
                        "connection lost while waiting for {service_name}: {other}"
                    )),
                });
            }
            Err(e) => warn!(service = service_name, error = %e, "readiness probe failed"),
        }
        if shutdown.is_triggered() {
            error!(service = service_name, "Interrupted while waiting for the service. Exiting.");
            return Err(ControlError::Interrupted(service_name.to_string()));
        }
        info!(service = service_name, "service not available, waiting again...");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.triggered() => {}
        }
    }
}

/// Connect, subscribe and run the motion cycle against one transport.
///
/// The sensor subscription is only opened once the service is ready, so an
/// interrupted wait leaves no subscription behind.
///
/// Returns the number of cycles run when `shutdown` ended the loop, and
/// [`ControlError::Transport`] when the sample stream closed first.
pub async fn run_motion_cycle<C>(
    client: Arc<C>,
    config: &ControllerConfig,
    shutdown: &Shutdown,
) -> Result<u64, ControlError>
where
    C: ServiceClient + SensorSource + 'static,
{
    let controller = MotionCycleController::connect(Arc::clone(&client), config, shutdown).await?;
    let samples = client
        .subscribe(&config.sensor_topic, &config.sensor_type, config.queue_length)
        .await?;
    let cycles = controller.run(samples, shutdown).await;
    if !shutdown.is_triggered() {
        return Err(ControlError::Transport(format!(
            "sensor stream {} closed after {cycles} cycles",
            config.sensor_topic
        )));
    }
    Ok(cycles)
}
