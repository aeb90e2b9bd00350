use std::collections::HashSet;

use vigil_core::{MessageHandler, MessageType, Payload, ValidationResult, VigilError};

use super::{DIRECTION_RESULT, check_timestamp, fill_timestamp};

/// Commands accepted by default, matching the motion classifier's output.
pub const DEFAULT_COMMANDS: &[&str] =
    &["forward", "backward", "turn_left", "turn_right", "stationary"];

/// Handler for `direction_result` messages.
///
/// Required: `command` within the allowed set (case-insensitive).
/// Optional: `intensity` and `angular_intensity` as non-negative numbers,
/// `timestamp` as ISO 8601. Normalization lowercases the command, defaults a
/// missing `intensity` to `0`, and stamps a missing timestamp.
pub struct DirectionHandler {
    type_name: MessageType,
    commands: HashSet<String>,
}

impl Default for DirectionHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectionHandler {
    /// Handler accepting the default command set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_commands(DEFAULT_COMMANDS.iter().map(|c| (*c).to_string()))
    }

    /// Handler accepting a custom command set (stored lowercased).
    #[must_use]
    pub fn with_commands(commands: impl IntoIterator<Item = String>) -> Self {
        Self {
            type_name: MessageType::new(DIRECTION_RESULT)
                .expect("built-in type name is valid"),
            commands: commands.into_iter().map(|c| c.to_lowercase()).collect(),
        }
    }

    fn check_intensity(&self, payload: &Payload, field: &str, result: &mut ValidationResult) {
        if let Some(value) = payload.get(field) {
            match value.as_f64() {
                Some(v) if v >= 0.0 => {}
                Some(v) => result.push_error(format!("{field} must be non-negative, got {v}")),
                None => result.push_error(format!("{field} must be a number")),
            }
        }
    }
}

impl MessageHandler for DirectionHandler {
    fn type_name(&self) -> &MessageType {
        &self.type_name
    }

    fn validate(&self, payload: &Payload) -> ValidationResult {
        let mut result = ValidationResult::ok();
        match payload.get("command") {
            None => result.push_error("missing required field: command"),
            Some(value) => match value.as_str() {
                Some(command) if self.commands.contains(&command.to_lowercase()) => {}
                Some(command) => {
                    let mut allowed: Vec<&str> =
                        self.commands.iter().map(String::as_str).collect();
                    allowed.sort_unstable();
                    result.push_error(format!(
                        "unknown command {command:?}; expected one of {allowed:?}"
                    ));
                }
                None => result.push_error("command must be a string"),
            },
        }
        self.check_intensity(payload, "intensity", &mut result);
        self.check_intensity(payload, "angular_intensity", &mut result);
        check_timestamp(payload, &mut result);
        result
    }

    fn process(&self, mut payload: Payload) -> Result<Payload, VigilError> {
        if let Some(command) = payload.get("command").and_then(|v| v.as_str()) {
            let canonical = command.to_lowercase();
            payload.insert(
                "command".to_string(),
                serde_json::Value::String(canonical),
            );
        }
        for field in ["intensity", "angular_intensity"] {
            if let Some(v) = payload.get(field).and_then(serde_json::Value::as_f64) {
                let clamped = if v.is_finite() { v.max(0.0) } else { 0.0 };
                if let Some(n) = serde_json::Number::from_f64(clamped) {
                    payload.insert(field.to_string(), serde_json::Value::Number(n));
                }
            }
        }
        if !payload.contains_key("intensity") {
            payload.insert("intensity".to_string(), serde_json::json!(0.0));
        }
        fill_timestamp(&mut payload);
        Ok(payload)
    }
}
