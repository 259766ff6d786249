//! rosbridge v2 client.
//!
//! [`RosbridgeClient`] connects to a `rosbridge_server` WebSocket endpoint and
//! implements both transport seams:
//!
//! * **Inbound (Topics)** – `subscribe` sends an `{"op":"subscribe"}` frame;
//!   every `{"op":"publish"}` frame that comes back is wrapped in a
//!   [`SensorSample`] and fanned out over an internal [`SampleBus`].
//!
//! * **Outbound (Services)** – `call` sends an `{"op":"call_service"}` frame
//!   tagged with a unique id and resolves once the matching
//!   `{"op":"service_response"}` arrives.
//!
//! * **Discovery** – `is_service_ready` asks `/rosapi/services` for the list
//!   of advertised services. A probe gives up after the probe timeout, which
//!   is kept shorter than the call timeout so a silent rosapi does not stretch
//!   the readiness poll.
//!
//! When the socket closes every pending call fails with
//! [`ControlError::Transport`] and every subscription observes `Closed`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tac3d_types::{ControlError, SensorSample, ServiceReply};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bus::{SampleBus, SampleReceiver};
use crate::transport::{SensorSource, ServiceClient};

/// rosapi service that lists every advertised service name.
pub const ROSAPI_SERVICES: &str = "/rosapi/services";

/// How long a service call may stay unanswered before it fails.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a readiness probe may stay unanswered.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

type CallResult = Result<ServiceReply, ControlError>;
type PendingCalls = Arc<Mutex<HashMap<String, oneshot::Sender<CallResult>>>>;

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Outbound<'a> {
    Subscribe {
        topic: &'a str,
        #[serde(rename = "type")]
        msg_type: &'a str,
        queue_length: usize,
    },
    CallService {
        id: &'a str,
        service: &'a str,
        args: &'a serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Inbound {
    Publish {
        topic: String,
        msg: serde_json::Value,
    },
    ServiceResponse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        service: String,
        #[serde(default)]
        values: serde_json::Value,
        result: bool,
    },
    Status {
        #[serde(default)]
        level: Option<String>,
        #[serde(default)]
        msg: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// WebSocket client for a `rosbridge_server`.
pub struct RosbridgeClient {
    url: String,
    outbound: mpsc::UnboundedSender<Message>,
    pending: PendingCalls,
    bus: SampleBus,
    subscribed: Mutex<HashSet<String>>,
    closed: Arc<AtomicBool>,
    call_timeout: Duration,
    probe_timeout: Duration,
}

impl RosbridgeClient {
    /// Open a WebSocket to `url` (e.g. `ws://localhost:9090`) and start the
    /// background reader and writer tasks.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Transport`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, ControlError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ControlError::Transport(format!("rosbridge connect to {url}: {e}")))?;
        info!(url, "connected to rosbridge");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));
        let bus = SampleBus::default();
        let closed = Arc::new(AtomicBool::new(false));

        // Writer: drains the outbound queue until the client is dropped.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = ws_tx.send(frame).await {
                    warn!(error = %e, "rosbridge send failed");
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        // Reader: routes publishes to the bus and responses to their callers.
        let reader_pending = Arc::clone(&pending);
        let reader_bus = bus.clone();
        let reader_closed = Arc::clone(&closed);
        let reader_url = url.to_string();
        tokio::spawn(async move {
            while let Some(frame) = ws_rx.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        handle_inbound(text.as_str(), &reader_pending, &reader_bus);
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!(url = %reader_url, error = %e, "rosbridge receive error");
                        break;
                    }
                }
            }
            info!(url = %reader_url, "rosbridge connection closed");
            reader_closed.store(true, Ordering::SeqCst);
            fail_pending(&reader_pending, &reader_url);
            reader_bus.close_all();
        });

        Ok(Self {
            url: url.to_string(),
            outbound,
            pending,
            bus,
            subscribed: Mutex::new(HashSet::new()),
            closed,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    /// Override the service-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Override the readiness-probe timeout. Callers polling at a fixed
    /// interval pass that interval here.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    fn ensure_open(&self) -> Result<(), ControlError> {
        if self.is_closed() {
            return Err(ControlError::Transport(format!(
                "rosbridge connection to {} is closed",
                self.url
            )));
        }
        Ok(())
    }

    fn send_frame(&self, frame: &Outbound<'_>) -> Result<(), ControlError> {
        let text = serde_json::to_string(frame)?;
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| ControlError::Transport(format!("rosbridge writer for {} has stopped", self.url)))
    }

    async fn call_within(
        &self,
        service: &str,
        args: serde_json::Value,
        timeout: Duration,
    ) -> Result<ServiceReply, ControlError> {
        self.ensure_open()?;
        let id = format!("call_service:{service}:{}", Uuid::new_v4());
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id.clone(), tx);
        // The reader marks the client closed before draining, so a call
        // registered after the drain sees the flag here.
        if let Err(e) = self.ensure_open() {
            self.lock_pending().remove(&id);
            return Err(e);
        }

        let frame = Outbound::CallService {
            id: &id,
            service,
            args: &args,
        };
        if let Err(e) = self.send_frame(&frame) {
            self.lock_pending().remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ControlError::Transport(format!(
                "rosbridge connection closed before {service} replied"
            ))),
            Err(_) => {
                self.lock_pending().remove(&id);
                Err(ControlError::Timeout {
                    service: service.to_string(),
                    after_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<CallResult>>> {
        lock(&self.pending)
    }
}

#[async_trait]
impl ServiceClient for RosbridgeClient {
    /// Ask rosapi whether `service` is advertised.
    ///
    /// Bounded by the probe timeout rather than the call timeout.
    async fn is_service_ready(&self, service: &str) -> Result<bool, ControlError> {
        let reply = self
            .call_within(ROSAPI_SERVICES, json!({}), self.probe_timeout)
            .await?;
        let listed = reply
            .values
            .get("services")
            .and_then(|s| s.as_array())
            .ok_or_else(|| {
                ControlError::Protocol(format!(
                    "{ROSAPI_SERVICES} reply has no service list: {}",
                    reply.values
                ))
            })?;
        Ok(listed.iter().any(|s| s.as_str() == Some(service)))
    }

    async fn call(
        &self,
        service: &str,
        args: serde_json::Value,
    ) -> Result<ServiceReply, ControlError> {
        self.call_within(service, args, self.call_timeout).await
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for RosbridgeClient {
    async fn subscribe(
        &self,
        topic: &str,
        msg_type: &str,
        queue_length: usize,
    ) -> Result<SampleReceiver, ControlError> {
        self.ensure_open()?;
        // Attach locally before asking the server so no early publish is lost.
        let receiver = self.bus.subscribe(topic);
        let first = self
            .subscribed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(topic.to_string());
        if first {
            self.send_frame(&Outbound::Subscribe {
                topic,
                msg_type,
                queue_length,
            })?;
            info!(topic, msg_type, queue_length, "subscribed");
        }
        Ok(receiver)
    }
}

fn handle_inbound(text: &str, pending: &PendingCalls, bus: &SampleBus) {
    let frame = match serde_json::from_str::<Inbound>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "unparseable rosbridge frame");
            return;
        }
    };

    match frame {
        Inbound::Publish { topic, msg } => {
            let sample = SensorSample::new(topic.as_str(), msg);
            if let Err(e) = bus.publish(&topic, sample) {
                debug!(topic = %topic, error = %e, "sample dropped");
            }
        }
        Inbound::ServiceResponse {
            id,
            service,
            values,
            result,
        } => {
            let Some(id) = id else {
                debug!(service = %service, "service response without id");
                return;
            };
            let Some(tx) = lock(pending).remove(&id) else {
                debug!(id = %id, "response for unknown or expired call");
                return;
            };
            let reply = if result {
                Ok(ServiceReply { service, values })
            } else {
                Err(ControlError::ServiceFailed {
                    service,
                    details: values.to_string(),
                })
            };
            let _ = tx.send(reply);
        }
        Inbound::Status { level, msg } => {
            warn!(
                level = level.as_deref().unwrap_or("unknown"),
                msg = msg.as_deref().unwrap_or(""),
                "rosbridge status"
            );
        }
        Inbound::Unknown => debug!("ignoring rosbridge frame with unknown op"),
    }
}

fn fail_pending(pending: &PendingCalls, url: &str) {
    for (_, tx) in lock(pending).drain() {
        let _ = tx.send(Err(ControlError::Transport(format!(
            "rosbridge connection to {url} closed"
        ))));
    }
}

fn lock(pending: &PendingCalls) -> MutexGuard<'_, HashMap<String, oneshot::Sender<CallResult>>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}
