//! Forwards broker events to an external streaming sink.
//!
//! The adapter is just another subscriber: it registers one forwarding
//! callback per registered message type and serializes each processed
//! message into the JSON envelope consumed by the realtime gateway.
//! Backpressure belongs to the sink; a full channel drops the envelope at
//! the adapter's edge, a closed channel surfaces as an ordinary subscriber
//! failure, and neither ever fails a publish.
//!
//! Lifecycle contract:
//! - [`attach`](StreamAdapter::attach) subscribes and emits one
//!   `current_state` envelope describing the routing model.
//! - [`detach`](StreamAdapter::detach) (or drop) unsubscribes. The adapter
//!   holds the broker weakly, so an adapter kept alive past the broker never
//!   keeps it pinned.

use std::sync::{Arc, Weak};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use vigil_core::{Camera, MessageData, ProcessedMessage, StreamConfig, VigilError};

use crate::broker::Broker;
use crate::handlers::{AI_ALERT, ANGLE_VALUE, DIRECTION_RESULT};
use crate::resolver::RoutingSnapshot;
use crate::subscriptions::SubscriptionId;

/// Type name of the one-shot routing snapshot event.
pub const CURRENT_STATE: &str = "current_state";

/// JSON envelope pushed to the streaming sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEnvelope {
    /// The message type (or `current_state`).
    #[serde(rename = "type")]
    pub message_type: String,
    /// Id of the originating publish.
    pub message_id: Uuid,
    /// ISO 8601 timestamp of the message.
    pub timestamp: String,
    /// The normalized payload (or the routing snapshot).
    pub data: serde_json::Value,
    /// Cameras the event activates.
    pub cameras: Vec<Camera>,
    /// Display priority; alerts rank by severity.
    pub priority: u32,
    /// Seconds the UI should keep the event on screen.
    pub remaining_time: u32,
}

impl StreamEnvelope {
    /// Build an envelope from a processed message.
    #[must_use]
    pub fn from_processed(processed: &ProcessedMessage, remaining_time: u32) -> Self {
        Self {
            message_type: processed.message.message_type.to_string(),
            message_id: processed.message.message_id,
            timestamp: processed
                .message
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            data: serde_json::Value::Object(processed.message.data.clone()),
            cameras: processed.cameras.clone(),
            priority: priority_for(&processed.message),
            remaining_time,
        }
    }

    fn current_state(snapshot: &RoutingSnapshot) -> Self {
        let data = serde_json::to_value(snapshot)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
        Self {
            message_type: CURRENT_STATE.to_string(),
            message_id: Uuid::new_v4(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            data,
            cameras: Vec::new(),
            priority: 0,
            remaining_time: 0,
        }
    }
}

/// Display priority by type; alert severity dominates.
fn priority_for(message: &MessageData) -> u32 {
    match message.message_type.as_str() {
        AI_ALERT => match message.data.get("severity").and_then(|v| v.as_str()) {
            Some("critical") => 4,
            Some("high") => 3,
            Some("medium") => 2,
            _ => 1,
        },
        DIRECTION_RESULT => 2,
        ANGLE_VALUE => 1,
        _ => 0,
    }
}

/// Bridges the broker to a bounded envelope channel owned by the sink.
pub struct StreamAdapter {
    broker: Weak<Broker>,
    subscriptions: Vec<(String, SubscriptionId)>,
}

impl StreamAdapter {
    /// Subscribe a forwarding callback for every registered type and emit the
    /// initial `current_state` envelope.
    ///
    /// Returns the adapter and the receiving half of the envelope channel.
    ///
    /// # Errors
    /// `BrokerShutDown` if the broker has terminated.
    pub async fn attach(
        broker: &Arc<Broker>,
        cfg: StreamConfig,
    ) -> Result<(Self, mpsc::Receiver<StreamEnvelope>), VigilError> {
        let (tx, rx) = mpsc::channel(cfg.channel_capacity.max(1));

        let mut subscriptions = Vec::new();
        for message_type in broker.list_types() {
            let tx = tx.clone();
            let remaining_time = cfg.remaining_time_secs;
            let id = broker.subscribe(message_type.as_str(), move |processed| {
                forward(&tx, StreamEnvelope::from_processed(processed, remaining_time))
            })?;
            subscriptions.push((message_type.to_string(), id));
        }

        let snapshot = broker.routing_snapshot().await;
        if let Err(err) = forward(&tx, StreamEnvelope::current_state(&snapshot)) {
            warn!(
                target: "vigil::stream",
                error = %err,
                "could not emit initial current_state envelope"
            );
        }

        Ok((
            Self {
                broker: Arc::downgrade(broker),
                subscriptions,
            },
            rx,
        ))
    }

    /// Unsubscribe every forwarding callback. Idempotent; also runs on drop.
    pub fn detach(&mut self) {
        if let Some(broker) = self.broker.upgrade() {
            for (message_type, id) in self.subscriptions.drain(..) {
                broker.unsubscribe(&message_type, id);
            }
        } else {
            self.subscriptions.clear();
        }
    }
}

impl Drop for StreamAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

fn forward(
    tx: &mpsc::Sender<StreamEnvelope>,
    envelope: StreamEnvelope,
) -> Result<(), VigilError> {
    match tx.try_send(envelope) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(envelope)) => {
            debug!(
                target: "vigil::stream",
                message_id = %envelope.message_id,
                "sink channel full; dropping envelope"
            );
            Ok(())
        }
        Err(TrySendError::Closed(_)) => {
            Err(VigilError::StreamSink("sink channel closed".to_string()))
        }
    }
}
