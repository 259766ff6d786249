//! Topic-keyed publish/subscribe bus for inbound sensor samples.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every sample without any single subscriber blocking
//! the others. A channel is created lazily the first time a topic is
//! published to or subscribed on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tac3d_types::{ControlError, SensorSample};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered samples before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Shared sample bus. Clone it cheaply – all clones share the same topic
/// table.
#[derive(Clone, Debug)]
pub struct SampleBus {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<SensorSample>>>>,
}

impl SampleBus {
    /// Create a new bus with the given per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Publish `sample` on `topic`.
    ///
    /// Returns the number of active receivers that were handed the sample,
    /// or [`ControlError::Channel`] when nobody is subscribed to the topic.
    pub fn publish(&self, topic: &str, sample: SensorSample) -> Result<usize, ControlError> {
        let sender = self.sender(topic);
        sender
            .send(sample)
            .map_err(|_| ControlError::Channel(format!("No subscribers for topic {topic}")))
    }

    /// Subscribe to `topic`.
    pub fn subscribe(&self, topic: &str) -> SampleReceiver {
        SampleReceiver {
            topic: topic.to_string(),
            receiver: self.sender(topic).subscribe(),
        }
    }

    /// Whether at least one receiver is listening on `topic`.
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.lock()
            .get(topic)
            .is_some_and(|s| s.receiver_count() > 0)
    }

    /// Drop every topic sender. Receivers drain what is buffered and then
    /// observe [`broadcast::error::RecvError::Closed`].
    pub fn close_all(&self) {
        self.lock().clear();
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<SensorSample> {
        self.lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<SensorSample>>> {
        // The table only holds senders; a poisoned guard is still consistent.
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SampleBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single topic.
///
/// Obtained via [`SampleBus::subscribe`].
#[derive(Debug)]
pub struct SampleReceiver {
    topic: String,
    receiver: broadcast::Receiver<SensorSample>,
}

impl SampleReceiver {
    /// Wait for the next sample on this topic.
    ///
    /// Returns:
    /// * `Ok(sample)` – a successfully received sample.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` samples were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<SensorSample, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// The topic this receiver is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}
