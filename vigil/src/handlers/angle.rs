use vigil_core::{MessageHandler, MessageType, Payload, ValidationResult, VigilError};

use super::{ANGLE_VALUE, check_timestamp, fill_timestamp};

/// Lowest raw angle the IMU driver emits.
pub const MIN_ANGLE: f64 = -180.0;
/// Highest raw angle the IMU driver emits.
pub const MAX_ANGLE: f64 = 360.0;

/// Handler for `angle_value` messages.
///
/// Required: `angle` as a number within `[-180.0, 360.0]`. The handler keeps
/// the angle in its source range; wrapping onto `[0, 360)` is the resolver's
/// job. Optional `timestamp` is validated and defaulted like every built-in.
pub struct AngleHandler {
    type_name: MessageType,
}

impl Default for AngleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AngleHandler {
    /// Construct the handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            type_name: MessageType::new(ANGLE_VALUE).expect("built-in type name is valid"),
        }
    }
}

impl MessageHandler for AngleHandler {
    fn type_name(&self) -> &MessageType {
        &self.type_name
    }

    fn validate(&self, payload: &Payload) -> ValidationResult {
        let mut result = ValidationResult::ok();
        match payload.get("angle") {
            None => result.push_error("missing required field: angle"),
            Some(value) => match value.as_f64() {
                Some(angle) if (MIN_ANGLE..=MAX_ANGLE).contains(&angle) => {}
                Some(angle) => result.push_error(format!(
                    "angle must be within [{MIN_ANGLE}, {MAX_ANGLE}], got {angle}"
                )),
                None => result.push_error("angle must be a number"),
            },
        }
        check_timestamp(payload, &mut result);
        result
    }

    fn process(&self, mut payload: Payload) -> Result<Payload, VigilError> {
        fill_timestamp(&mut payload);
        Ok(payload)
    }
}
