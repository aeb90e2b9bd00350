#![allow(dead_code)]
// Re-export fixture constructors so tests can `use helpers::*;`

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use vigil::{
    Broker, BrokerConfig, MessageHandler, MessageType, Payload, SubscriptionId, ValidationResult,
    VigilError,
};
use vigil_mock::MockRepository;

pub use vigil_mock::fixtures::{camera, range};

/// Broker config with near-instant retry backoff so degradation tests stay fast.
pub fn fast_config() -> BrokerConfig {
    let mut cfg = BrokerConfig::default();
    cfg.resolver.initial_backoff = Duration::from_millis(1);
    cfg.resolver.jitter_percent = 0;
    cfg
}

/// Broker backed by the given mock repository, with fast retry tuning.
pub fn broker_with(repository: Arc<MockRepository>) -> Broker {
    Broker::builder()
        .repository(repository)
        .config(fast_config())
        .build()
        .expect("builtin bootstrap")
}

/// Turn a `json!` object literal into a payload map.
pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("payload fixture must be a JSON object, got {other}"),
    }
}

/// Subscribe a counter; returns the subscription id and the invocation count.
pub fn counting_subscriber(
    broker: &Broker,
    message_type: &str,
) -> (SubscriptionId, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let id = broker
        .subscribe(message_type, move |_msg| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .expect("type must be registered");
    (id, count)
}

/// A handler that accepts and passes through every payload.
pub struct PassHandler {
    type_name: MessageType,
}

impl PassHandler {
    pub fn new(name: &str) -> Self {
        Self {
            type_name: MessageType::new(name).expect("valid test type name"),
        }
    }
}

impl MessageHandler for PassHandler {
    fn type_name(&self) -> &MessageType {
        &self.type_name
    }

    fn validate(&self, _payload: &Payload) -> ValidationResult {
        ValidationResult::ok()
    }

    fn process(&self, payload: Payload) -> Result<Payload, VigilError> {
        Ok(payload)
    }
}
