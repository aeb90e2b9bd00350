use vigil_core::{MessageHandler, MessageType, Payload, ValidationResult, VigilError};

use super::{AI_ALERT, check_timestamp, fill_timestamp};

/// Severities accepted on `ai_alert` messages, lowest to highest.
pub const SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];

/// Handler for `ai_alert` messages.
///
/// Required: non-empty `alert_type` and a `severity` from [`SEVERITIES`]
/// (case-insensitive; canonicalized to lowercase). Optional: `metadata` as a
/// map, `timestamp` as ISO 8601. The payload otherwise passes through.
pub struct AiAlertHandler {
    type_name: MessageType,
}

impl Default for AiAlertHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AiAlertHandler {
    /// Construct the handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            type_name: MessageType::new(AI_ALERT).expect("built-in type name is valid"),
        }
    }
}

impl MessageHandler for AiAlertHandler {
    fn type_name(&self) -> &MessageType {
        &self.type_name
    }

    fn validate(&self, payload: &Payload) -> ValidationResult {
        let mut result = ValidationResult::ok();
        match payload.get("alert_type").map(serde_json::Value::as_str) {
            None => result.push_error("missing required field: alert_type"),
            Some(None) => result.push_error("alert_type must be a string"),
            Some(Some("")) => result.push_error("alert_type must not be empty"),
            Some(Some(_)) => {}
        }
        match payload.get("severity").map(serde_json::Value::as_str) {
            None => result.push_error("missing required field: severity"),
            Some(None) => result.push_error("severity must be a string"),
            Some(Some(severity)) => {
                if !SEVERITIES.contains(&severity.to_lowercase().as_str()) {
                    result.push_error(format!(
                        "unknown severity {severity:?}; expected one of {SEVERITIES:?}"
                    ));
                }
            }
        }
        if let Some(metadata) = payload.get("metadata")
            && !metadata.is_object()
        {
            result.push_error("metadata must be a map");
        }
        check_timestamp(payload, &mut result);
        result
    }

    fn process(&self, mut payload: Payload) -> Result<Payload, VigilError> {
        if let Some(severity) = payload.get("severity").and_then(|v| v.as_str()) {
            let canonical = severity.to_lowercase();
            payload.insert(
                "severity".to_string(),
                serde_json::Value::String(canonical),
            );
        }
        fill_timestamp(&mut payload);
        Ok(payload)
    }
}
