//! `tac3d-control` – the open-loop motion cycle.
//!
//! Every sensor sample that arrives triggers one displacement command
//! computed from elapsed time alone, sent to the motion service without
//! waiting for its reply.
//!
//! # Modules
//!
//! - [`controller`] – [`MotionCycleController`]: waits for the motion service,
//!   then runs the sense → compute → dispatch cycle.
//! - [`trajectory`] – [`CircularTrajectory`]: the time-parameterised circle
//!   the commands trace.
//! - [`dispatch`] – [`DispatchHandle`]: an in-flight request whose outcome
//!   may be awaited or explicitly discarded.
//! - [`shutdown`] – [`Shutdown`]: stop signal shared between the signal
//!   handler and async code.
//! - [`config`] – [`ControllerConfig`]: endpoint names and cycle parameters.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   `tracing` subscriber with optional OTLP export.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod shutdown;
pub mod telemetry;
pub mod trajectory;

pub use config::ControllerConfig;
pub use controller::{MotionCycleController, run_motion_cycle, wait_for_service};
pub use dispatch::DispatchHandle;
pub use shutdown::Shutdown;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use trajectory::CircularTrajectory;
