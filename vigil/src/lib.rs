//! Vigil mediates motion commands, sensor angles, and AI alerts between a
//! physical sensor stack and a realtime UI.
//!
//! Overview
//! - An in-process typed pub/sub broker: each message type binds to a
//!   validating/normalizing handler, and every published event is joined
//!   against the persisted camera routing model before fan-out.
//! - Subscribers are plain callbacks invoked in subscription order; a failing
//!   or panicking subscriber is logged and never affects its peers or the
//!   publisher.
//! - Camera resolution reads the routing repository through TTL'd
//!   single-flight caches with bounded retry and a last-known-good fallback,
//!   so a degraded database stales the routing rather than dropping events.
//! - The stream adapter forwards every processed event as a JSON envelope to
//!   a bounded channel owned by the realtime gateway.
//!
//! Key behaviors and trade-offs
//! - `publish` never returns an error: validation failures, resolver
//!   degradation, and subscriber faults are all reported in the
//!   [`PublishResult`]; only validation and processing decide `success`.
//! - Per-publisher ordering holds (messages awaited in sequence arrive in
//!   sequence); nothing is guaranteed across publishers.
//! - The broker is a process singleton via [`Broker::global`]; isolated
//!   instances for tests and embedding come from [`Broker::builder`].
//!
//! Examples
//! - Basic publish/subscribe: see `./examples/01_simple_publish.rs`.
//! - Streaming to a sink: see `./examples/02_stream_adapter.rs`.
#![warn(missing_docs)]

/// The broker facade, its builder, and the process-global accessor.
pub mod broker;
/// Built-in handlers for the three core message types.
pub mod handlers;
mod registry;
/// Camera resolution with caching, retry, and fallback.
pub mod resolver;
mod stats;
/// The stream adapter bridging the broker to a realtime sink.
pub mod stream;
mod subscriptions;

pub use broker::{Broker, BrokerBuilder};
pub use handlers::{
    AI_ALERT, ANGLE_VALUE, AiAlertHandler, AngleHandler, DIRECTION_RESULT, DirectionHandler,
};
pub use resolver::{
    AlertRoutingPolicy, CameraResolver, NoAlertRouting, RoutingSnapshot, direction_for_command,
};
pub use stats::StatsSnapshot;
pub use stream::{CURRENT_STATE, StreamAdapter, StreamEnvelope};
pub use subscriptions::{SubscriberCallback, SubscriptionId, SubscriptionInfo};

// Re-export core types for convenience
pub use vigil_core::{
    AngleRange, AngleWrapMode, BrokerConfig, Camera, CameraDirection, CameraStatus, MessageData,
    MessageHandler, MessageType, Payload, ProcessedMessage, PublishResult, ResolverConfig,
    RoutingRepository, StreamConfig, ValidationResult, VigilError,
};
