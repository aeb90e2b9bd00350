//! Minimal end-to-end publish: wire the broker to a mock routing repository,
//! subscribe a listener, and publish one motion command.
//!
//! Run with: `cargo run --example 01_simple_publish`

use std::sync::Arc;

use vigil::{Broker, Payload};
use vigil_mock::{MockRepository, fixtures};

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
            .with_camera(fixtures::garden())
            .with_camera(fixtures::gate_offline()),
    );

    let broker = Broker::builder().repository(repository).build()?;

    broker.subscribe("direction_result", |msg| {
        let names: Vec<&str> = msg.cameras.iter().map(|c| c.name.as_str()).collect();
        println!(
            "[{}] command={} -> cameras {names:?}",
            msg.message.message_id,
            msg.message.data["command"]
        );
        Ok(())
    })?;

    let mut payload = Payload::new();
    payload.insert("command".into(), serde_json::json!("forward"));
    payload.insert("intensity".into(), serde_json::json!(0.8));

    let result = broker.publish("direction_result", payload).await;
    println!(
        "published {} in {:.2} ms: notified={} failed={}",
        result.message_id, result.duration_ms, result.subscribers_notified, result.subscribers_failed
    );

    Ok(())
}
