//! Built-in per-type validators and normalizers.
//!
//! Each handler checks the payload against its type's schema and then
//! canonicalizes it: casing is lowered, defaulted fields are filled, and a
//! missing timestamp is stamped with the current wall-clock time. Custom
//! handlers register through the same [`MessageHandler`] contract.
//!
//! [`MessageHandler`]: vigil_core::MessageHandler

use chrono::{DateTime, SecondsFormat, Utc};

use vigil_core::{Payload, ValidationResult};

mod alert;
mod angle;
mod direction;

pub use alert::AiAlertHandler;
pub use angle::AngleHandler;
pub use direction::DirectionHandler;

/// Type name served by [`DirectionHandler`].
pub const DIRECTION_RESULT: &str = "direction_result";
/// Type name served by [`AngleHandler`].
pub const ANGLE_VALUE: &str = "angle_value";
/// Type name served by [`AiAlertHandler`].
pub const AI_ALERT: &str = "ai_alert";

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Validate an optional `timestamp` field: if present it must be an
/// ISO 8601 / RFC 3339 string.
pub(crate) fn check_timestamp(payload: &Payload, result: &mut ValidationResult) {
    if let Some(value) = payload.get("timestamp") {
        match value.as_str() {
            Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => {}
            Some(s) => result.push_error(format!("timestamp is not ISO 8601: {s:?}")),
            None => result.push_error("timestamp must be a string"),
        }
    }
}

/// Fill a missing `timestamp` with the current wall-clock time.
pub(crate) fn fill_timestamp(payload: &mut Payload) {
    if !payload.contains_key("timestamp") {
        payload.insert(
            "timestamp".to_string(),
            serde_json::Value::String(now_rfc3339()),
        );
    }
}
