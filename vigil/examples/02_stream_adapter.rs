//! Bridge the broker to a streaming sink: attach the adapter, publish a mix
//! of events, and print the JSON envelopes a realtime gateway would relay.
//!
//! Run with: `cargo run --example 02_stream_adapter`

use std::sync::Arc;

use vigil::{Broker, Payload, StreamAdapter, StreamConfig};
use vigil_mock::{MockRepository, fixtures};

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let repository = Arc::new(
        MockRepository::new()
            .with_camera(fixtures::front_door())
            .with_camera(fixtures::driveway())
            .with_range(fixtures::range("east", "East sector", 0.0, 90.0, &["cam-front"])),
    );

    let broker = Arc::new(Broker::builder().repository(repository).build()?);
    let (_adapter, mut envelopes) = StreamAdapter::attach(&broker, StreamConfig::default()).await?;

    broker
        .publish("direction_result", payload(serde_json::json!({"command": "forward"})))
        .await;
    broker
        .publish("angle_value", payload(serde_json::json!({"angle": 42.0})))
        .await;
    broker
        .publish(
            "ai_alert",
            payload(serde_json::json!({"alert_type": "intrusion", "severity": "high"})),
        )
        .await;

    // current_state + the three events
    for _ in 0..4 {
        if let Some(envelope) = envelopes.recv().await {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }

    Ok(())
}
