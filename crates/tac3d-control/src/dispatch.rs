//! [`DispatchHandle`] – the outcome of one fire-and-forget service request.
//!
//! Dispatching spawns the request onto the runtime and hands back a handle.
//! The caller either awaits [`DispatchHandle::outcome`] or calls
//! [`DispatchHandle::detach`] to state that the result is not wanted.
//! Dropping the handle detaches as well; the request keeps running either
//! way.

use std::sync::Arc;

use tac3d_middleware::ServiceClient;
use tac3d_types::{ControlError, DisplacementCommand, ServiceReply};
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a request that is already in flight.
#[derive(Debug)]
#[must_use = "await `outcome()` or call `detach()` to ignore the result"]
pub struct DispatchHandle {
    command: DisplacementCommand,
    task: JoinHandle<Result<ServiceReply, ControlError>>,
}

impl DispatchHandle {
    /// Spawn `service.call(service_name, command)` onto the current runtime.
    pub(crate) fn spawn<S>(service: Arc<S>, service_name: Arc<str>, command: DisplacementCommand) -> Self
    where
        S: ServiceClient + ?Sized + 'static,
    {
        let task = tokio::spawn(async move {
            let result = match serde_json::to_value(command) {
                Ok(args) => service.call(&service_name, args).await,
                Err(e) => Err(ControlError::from(e)),
            };
            if let Err(e) = &result {
                debug!(service = %service_name, error = %e, "dispatch failed");
            }
            result
        });
        Self { command, task }
    }

    /// The command carried by this request.
    pub fn command(&self) -> DisplacementCommand {
        self.command
    }

    /// Whether the request has completed (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the service's reply.
    ///
    /// # Errors
    ///
    /// Whatever the transport reported, or [`ControlError::Dispatch`] if the
    /// request task panicked or was cancelled by runtime shutdown.
    pub async fn outcome(self) -> Result<ServiceReply, ControlError> {
        self.task
            .await
            .map_err(|e| ControlError::Dispatch(format!("dispatch task ended abnormally: {e}")))?
    }

    /// Let the request finish in the background and ignore its result.
    pub fn detach(self) {}
}
