//! vigil-core
//!
//! Core types, capability traits, and configuration shared across the vigil
//! monitoring ecosystem.
//!
//! - `types`: message identities, payloads, validation outcomes, and the
//!   camera routing model (cameras, angle ranges).
//! - `handler`: the `MessageHandler` capability trait implemented per
//!   message type.
//! - `repository`: the narrow read-only `RoutingRepository` capability the
//!   resolver consumes.
//! - `config`: broker, resolver, and stream adapter configuration.
#![warn(missing_docs)]

/// Broker, resolver, and stream adapter configuration.
pub mod config;
/// Core error type shared by the broker and its collaborators.
pub mod error;
/// The per-type validator/normalizer capability trait.
pub mod handler;
/// The repository capability consumed by the camera resolver.
pub mod repository;
/// Message, camera, and routing data types.
pub mod types;

pub use config::{AngleWrapMode, BrokerConfig, ResolverConfig, StreamConfig};
pub use error::VigilError;
pub use handler::MessageHandler;
pub use repository::RoutingRepository;
pub use types::{
    AngleRange, Camera, CameraDirection, CameraStatus, MAX_TYPE_NAME_LEN, MessageData,
    MessageType, Payload, ProcessedMessage, PublishResult, ValidationResult,
};
