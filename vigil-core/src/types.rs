//! Data types flowing through the broker: message identities, payloads,
//! validation outcomes, and the camera routing model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::VigilError;

/// A message payload: string keys mapped to JSON-compatible values.
///
/// Opaque to the broker; handlers impose schema.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Maximum length accepted for a message type name.
pub const MAX_TYPE_NAME_LEN: usize = 64;

/// A registered message type name.
///
/// Non-empty ASCII, at most [`MAX_TYPE_NAME_LEN`] characters. Constructed via
/// [`MessageType::new`]; invalid names are rejected at construction so the
/// registries never hold malformed keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageType(String);

impl MessageType {
    /// Validate and construct a message type name.
    ///
    /// # Errors
    /// `InvalidArg` if the name is empty, non-ASCII, or longer than
    /// [`MAX_TYPE_NAME_LEN`].
    pub fn new(name: impl Into<String>) -> Result<Self, VigilError> {
        let name = name.into();
        if name.is_empty() {
            return Err(VigilError::InvalidArg(
                "message type must not be empty".to_string(),
            ));
        }
        if !name.is_ascii() {
            return Err(VigilError::InvalidArg(format!(
                "message type must be ASCII: {name:?}"
            )));
        }
        if name.len() > MAX_TYPE_NAME_LEN {
            return Err(VigilError::InvalidArg(format!(
                "message type exceeds {MAX_TYPE_NAME_LEN} chars: {name:?}"
            )));
        }
        Ok(Self(name))
    }

    /// The type name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MessageType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for MessageType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Outcome of handler validation.
///
/// Any non-empty `errors` implies `valid == false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the payload passed validation.
    pub valid: bool,
    /// Validation errors; non-empty means the message is rejected.
    pub errors: Vec<String>,
    /// Non-fatal observations; the message is still delivered.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no findings.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failing result carrying the given errors.
    #[must_use]
    pub fn fail(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
        }
    }

    /// Record an error, marking the result invalid.
    pub fn push_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    /// Record a warning without affecting validity.
    pub fn push_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// The normalized, in-flight message.
///
/// Created once the handler has normalized the payload; immutable thereafter.
/// `message_id` is unique across a process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    /// Unique id assigned at the entry of processing.
    pub message_id: Uuid,
    /// The registered type this message was published under.
    pub message_type: MessageType,
    /// The handler-normalized payload.
    pub data: Payload,
    /// Wall-clock creation time, nanosecond precision.
    pub timestamp: DateTime<Utc>,
    /// Optional hint identifying the producing component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_hint: Option<String>,
}

/// The validated, normalized, camera-resolved event delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedMessage {
    /// The normalized message.
    pub message: MessageData,
    /// Cameras this event should activate, ordered by `(name, id)`.
    pub cameras: Vec<Camera>,
    /// Time spent in validation, normalization, and resolution.
    pub processing_time_ms: f64,
    /// Processing-stage errors; empty on the happy path.
    pub errors: Vec<String>,
}

/// Outcome of a `publish` call.
///
/// `success` reflects validation and processing only; subscriber failures are
/// counted but never flip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    /// Whether validation and processing succeeded.
    pub success: bool,
    /// The id assigned to this publish.
    pub message_id: Uuid,
    /// Subscribers whose callback completed without error.
    pub subscribers_notified: usize,
    /// Subscribers whose callback errored or panicked.
    pub subscribers_failed: usize,
    /// Validation/processing errors; empty when `success` is true.
    pub errors: Vec<String>,
    /// Wall-clock duration of the whole publish.
    pub duration_ms: f64,
}

/// Direction family a camera can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraDirection {
    /// Facing the direction of travel.
    Forward,
    /// Facing away from the direction of travel.
    Backward,
    /// Covering the left flank.
    Left,
    /// Covering the right flank.
    Right,
    /// Wide/ambient coverage used when the platform is stationary.
    Idle,
}

impl CameraDirection {
    /// Every direction family, in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Idle,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Idle => "idle",
        }
    }
}

impl std::fmt::Display for CameraDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liveness status of a camera as last probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// The camera answered its last liveness probe.
    Online,
    /// The camera is unreachable.
    Offline,
}

/// A camera as the broker core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Stable identifier.
    pub id: String,
    /// Human-readable name; primary sort key for deterministic routing output.
    pub name: String,
    /// Stream URL (RTSP or similar); opaque to the core.
    pub url: String,
    /// Last known liveness status.
    pub status: CameraStatus,
    /// Direction families this camera covers.
    pub directions: Vec<CameraDirection>,
}

impl Camera {
    /// Whether this camera covers the given direction family.
    #[must_use]
    pub fn covers(&self, direction: CameraDirection) -> bool {
        self.directions.contains(&direction)
    }

    /// Whether the camera answered its last liveness probe.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self.status, CameraStatus::Online)
    }
}

/// A half-open interval of degrees `[min_angle, max_angle)` bound to cameras.
///
/// Invariant: `0 <= min_angle < max_angle <= 360`. Wrap-around ranges are
/// rejected at construction; callers model them as two ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    /// Stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Inclusive lower bound in degrees.
    pub min_angle: f64,
    /// Exclusive upper bound in degrees.
    pub max_angle: f64,
    /// Disabled ranges never participate in resolution.
    pub enabled: bool,
    /// Cameras activated when an angle falls inside this range.
    pub camera_ids: Vec<String>,
}

impl AngleRange {
    /// Validate and construct an angle range.
    ///
    /// # Errors
    /// `InvalidArg` unless `0 <= min_angle < max_angle <= 360` and both
    /// bounds are finite.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        min_angle: f64,
        max_angle: f64,
        enabled: bool,
        camera_ids: Vec<String>,
    ) -> Result<Self, VigilError> {
        if !min_angle.is_finite() || !max_angle.is_finite() {
            return Err(VigilError::InvalidArg(
                "angle range bounds must be finite".to_string(),
            ));
        }
        if !(0.0..360.0).contains(&min_angle) || max_angle > 360.0 || min_angle >= max_angle {
            return Err(VigilError::InvalidArg(format!(
                "angle range requires 0 <= min < max <= 360, got [{min_angle}, {max_angle})"
            )));
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            min_angle,
            max_angle,
            enabled,
            camera_ids,
        })
    }

    /// Whether a normalized angle in `[0, 360)` falls inside `[min, max)`.
    #[must_use]
    pub fn contains(&self, angle: f64) -> bool {
        self.min_angle <= angle && angle < self.max_angle
    }
}
