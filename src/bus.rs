use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;

/// Default number of messages a slow subscriber may fall behind before it starts missing some.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// A message on the bus.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// In-process publish/subscribe bus keyed by topic name.
///
/// Delivery is best effort: publishing with no subscriber drops the message,
/// and a subscriber that lags by more than the capacity loses the oldest ones.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
    capacity: usize,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish a raw payload. Returns how many subscribers (of any topic) saw it.
    pub fn emit(&self, topic: &str, payload: serde_json::Value) -> usize {
        let envelope = Envelope {
            topic: topic.to_string(),
            payload,
        };
        match self.sender.send(envelope) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(topic, "no subscribers, message dropped");
                0
            }
        }
    }

    /// Serialize `payload` and publish it.
    pub fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> serde_json::Result<usize> {
        let value = serde_json::to_value(payload)?;
        Ok(self.emit(topic, value))
    }

    /// Subscribe to one topic. Only messages published after this call are seen.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        Subscription {
            topic: topic.to_string(),
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving side of [`EventBus::subscribe`].
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Envelope>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next payload on this topic, or `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.topic == self.topic => return Some(envelope.payload),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "subscriber lagged, messages lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
