//! `tac3d-middleware` – transport plumbing for the motion controller.
//!
//! Moves sensor samples in and service requests out without caring about
//! what either of them mean.
//!
//! # Modules
//!
//! - [`bus`] – topic-keyed publish/subscribe fan-out of [`SensorSample`]s
//!   built on Tokio broadcast channels.
//! - [`transport`] – the [`ServiceClient`] and [`SensorSource`] traits the
//!   controller is written against.
//! - [`rosbridge`] – [`RosbridgeClient`], a rosbridge v2 JSON/WebSocket
//!   implementation of both traits.
//!
//! [`SensorSample`]: tac3d_types::SensorSample

pub mod bus;
pub mod rosbridge;
pub mod transport;

pub use bus::{SampleBus, SampleReceiver};
pub use rosbridge::RosbridgeClient;
pub use transport::{SensorSource, ServiceClient};
