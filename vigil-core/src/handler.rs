use crate::{MessageType, Payload, ValidationResult, VigilError};

/// Per-type validator and normalizer.
///
/// Implementations are stateless with respect to individual messages but may
/// hold configuration (e.g. an allowed command set). The broker invokes
/// `validate` first; only payloads that pass are handed to `process`.
///
/// The registry checks at registration time that `type_name()` matches the
/// type being registered; a mismatch is a `HandlerContract` error. This is
/// the runtime half of the capability check; static conformance is already
/// guaranteed by the trait bound.
pub trait MessageHandler: Send + Sync {
    /// The message type this handler serves.
    fn type_name(&self) -> &MessageType;

    /// Check the payload against this type's schema.
    ///
    /// Must not mutate shared state; called on every publish.
    fn validate(&self, payload: &Payload) -> ValidationResult;

    /// Normalize a payload that already passed [`validate`](Self::validate):
    /// canonicalize casing, fill defaulted fields, clamp numeric values.
    ///
    /// # Errors
    /// Returns an error only for defects that validation cannot see
    /// (the broker surfaces it as a failed publish).
    fn process(&self, payload: Payload) -> Result<Payload, VigilError>;
}
