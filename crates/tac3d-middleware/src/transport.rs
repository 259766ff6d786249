//! Transport seams between the controller and the outside world.
//!
//! The controller never speaks a wire protocol itself. It talks to a
//! [`ServiceClient`] for outbound requests and a [`SensorSource`] for inbound
//! samples, so the rosbridge transport can be swapped for an in-process stub
//! without touching the control cycle.

use async_trait::async_trait;
use tac3d_types::{ControlError, ServiceReply};

use crate::bus::SampleReceiver;

/// Outbound request/response transport.
///
/// # Contract
///
/// * `is_service_ready` – a single readiness probe. It must return promptly;
///   polling and back-off belong to the caller.
///
/// * `call` – issue one request with JSON `args` and resolve once the reply
///   (or a failure) is known. Implementations must be safe to call
///   concurrently from many tasks.
///
/// * `is_closed` – `true` once the connection behind the client is gone for
///   good. Nothing the remote side does can make a service ready again after
///   that.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Whether `service` is currently able to accept requests.
    async fn is_service_ready(&self, service: &str) -> Result<bool, ControlError>;

    /// Call `service` with `args` and wait for its reply.
    async fn call(
        &self,
        service: &str,
        args: serde_json::Value,
    ) -> Result<ServiceReply, ControlError>;

    /// Whether the underlying connection has been lost. In-process clients
    /// never close.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Inbound topic transport.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Subscribe to `topic` carrying messages of `msg_type`.
    ///
    /// `queue_length` is forwarded to the remote side as a buffering hint.
    async fn subscribe(
        &self,
        topic: &str,
        msg_type: &str,
        queue_length: usize,
    ) -> Result<SampleReceiver, ControlError>;
}
