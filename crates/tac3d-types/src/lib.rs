use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A planar displacement request for the motion-control service.
///
/// Serialises as `{"dx": .., "dy": ..}`, the argument layout of the
/// `Control2d` service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplacementCommand {
    pub dx: f64,
    pub dy: f64,
}

impl DisplacementCommand {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// One inbound sensor message.
///
/// The payload is carried as raw JSON and never interpreted; only the
/// arrival of a sample matters to the control cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSample {
    pub id: Uuid,
    /// e.g. "/sensors/tactile_image"
    pub topic: String,
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl SensorSample {
    /// Wrap `payload` as a freshly received sample on `topic`.
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            received_at: Utc::now(),
            payload,
        }
    }
}

/// Decoded response of a service call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceReply {
    pub service: String,
    pub values: serde_json::Value,
}

/// Error type shared by every crate in the workspace.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ControlError {
    #[error("Interrupted while waiting for service {0}")]
    Interrupted(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Protocol Error: {0}")]
    Protocol(String),

    #[error("Service {service} failed: {details}")]
    ServiceFailed { service: String, details: String },

    #[error("Service {service} did not reply within {after_ms} ms")]
    Timeout { service: String, after_ms: u64 },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Dispatch Error: {0}")]
    Dispatch(String),
}

impl From<serde_json::Error> for ControlError {
    fn from(e: serde_json::Error) -> Self {
        ControlError::Serialization(e.to_string())
    }
}
