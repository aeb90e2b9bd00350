mod helpers;

use chrono::DateTime;
use serde_json::json;
use vigil::{AiAlertHandler, AngleHandler, DirectionHandler, MessageHandler};

use crate::helpers::payload;

#[test]
fn direction_accepts_known_commands_case_insensitively() {
    let handler = DirectionHandler::new();
    for command in ["forward", "BACKWARD", "Turn_Left", "turn_right", "stationary"] {
        let result = handler.validate(&payload(json!({"command": command})));
        assert!(result.valid, "command {command:?}: {:?}", result.errors);
    }
}

#[test]
fn direction_rejects_missing_unknown_and_non_string_commands() {
    let handler = DirectionHandler::new();

    let result = handler.validate(&payload(json!({})));
    assert!(result.errors.iter().any(|e| e.contains("missing")));

    let result = handler.validate(&payload(json!({"command": "sideways"})));
    assert!(result.errors.iter().any(|e| e.contains("unknown command")));

    let result = handler.validate(&payload(json!({"command": 7})));
    assert!(result.errors.iter().any(|e| e.contains("must be a string")));
}

#[test]
fn direction_rejects_negative_or_non_numeric_intensity() {
    let handler = DirectionHandler::new();

    let result = handler.validate(&payload(json!({"command": "forward", "intensity": -1.0})));
    assert!(!result.valid);

    let result = handler.validate(&payload(
        json!({"command": "forward", "angular_intensity": "fast"}),
    ));
    assert!(!result.valid);

    let result = handler.validate(&payload(
        json!({"command": "forward", "intensity": 0.0, "angular_intensity": 2.5}),
    ));
    assert!(result.valid);
}

#[test]
fn direction_normalization_canonicalizes_and_fills_defaults() {
    let handler = DirectionHandler::new();
    let normalized = handler
        .process(payload(json!({"command": "FORWARD"})))
        .unwrap();

    assert_eq!(normalized["command"], json!("forward"));
    assert_eq!(normalized["intensity"], json!(0.0));
    let ts = normalized["timestamp"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(ts).is_ok());
}

#[test]
fn direction_normalization_keeps_explicit_fields() {
    let handler = DirectionHandler::new();
    let normalized = handler
        .process(payload(json!({
            "command": "turn_left",
            "intensity": 3.5,
            "timestamp": "2026-07-01T12:00:00Z"
        })))
        .unwrap();

    assert_eq!(normalized["intensity"], json!(3.5));
    assert_eq!(normalized["timestamp"], json!("2026-07-01T12:00:00Z"));
}

#[test]
fn direction_custom_command_set_replaces_the_default() {
    let handler = DirectionHandler::with_commands(["dock".to_string(), "undock".to_string()]);

    assert!(handler.validate(&payload(json!({"command": "DOCK"}))).valid);
    assert!(!handler.validate(&payload(json!({"command": "forward"}))).valid);
}

#[test]
fn angle_accepts_the_full_source_range() {
    let handler = AngleHandler::new();
    for angle in [-180.0, -0.5, 0.0, 359.9, 360.0] {
        let result = handler.validate(&payload(json!({"angle": angle})));
        assert!(result.valid, "angle {angle}: {:?}", result.errors);
    }
}

#[test]
fn angle_rejects_out_of_range_and_non_numeric_values() {
    let handler = AngleHandler::new();

    let result = handler.validate(&payload(json!({"angle": 500})));
    assert!(result.errors.iter().any(|e| e.contains("within")));

    let result = handler.validate(&payload(json!({"angle": -180.5})));
    assert!(!result.valid);

    let result = handler.validate(&payload(json!({"angle": "north"})));
    assert!(result.errors.iter().any(|e| e.contains("number")));

    let result = handler.validate(&payload(json!({})));
    assert!(result.errors.iter().any(|e| e.contains("missing")));
}

#[test]
fn angle_normalization_preserves_the_source_angle() {
    let handler = AngleHandler::new();
    let normalized = handler.process(payload(json!({"angle": -10.0}))).unwrap();
    // Wrapping onto [0, 360) happens in the resolver, not here.
    assert_eq!(normalized["angle"], json!(-10.0));
    assert!(normalized.contains_key("timestamp"));
}

#[test]
fn alert_requires_type_and_known_severity() {
    let handler = AiAlertHandler::new();

    let ok = handler.validate(&payload(
        json!({"alert_type": "intrusion", "severity": "CRITICAL"}),
    ));
    assert!(ok.valid);

    let result = handler.validate(&payload(json!({"severity": "low"})));
    assert!(result.errors.iter().any(|e| e.contains("alert_type")));

    let result = handler.validate(&payload(json!({"alert_type": "", "severity": "low"})));
    assert!(result.errors.iter().any(|e| e.contains("empty")));

    let result = handler.validate(&payload(
        json!({"alert_type": "intrusion", "severity": "urgent"}),
    ));
    assert!(result.errors.iter().any(|e| e.contains("unknown severity")));
}

#[test]
fn alert_metadata_must_be_a_map_when_present() {
    let handler = AiAlertHandler::new();

    let result = handler.validate(&payload(
        json!({"alert_type": "intrusion", "severity": "low", "metadata": [1, 2]}),
    ));
    assert!(result.errors.iter().any(|e| e.contains("metadata")));

    let result = handler.validate(&payload(json!({
        "alert_type": "intrusion",
        "severity": "low",
        "metadata": {"zone": "north"}
    })));
    assert!(result.valid);
}

#[test]
fn alert_normalization_lowercases_severity_and_passes_metadata_through() {
    let handler = AiAlertHandler::new();
    let normalized = handler
        .process(payload(json!({
            "alert_type": "intrusion",
            "severity": "High",
            "metadata": {"zone": "north"}
        })))
        .unwrap();

    assert_eq!(normalized["severity"], json!("high"));
    assert_eq!(normalized["metadata"], json!({"zone": "north"}));
    assert!(normalized.contains_key("timestamp"));
}

#[test]
fn bad_timestamps_fail_validation_on_every_builtin() {
    let direction = DirectionHandler::new();
    let angle = AngleHandler::new();
    let alert = AiAlertHandler::new();

    let result =
        direction.validate(&payload(json!({"command": "forward", "timestamp": "yesterday"})));
    assert!(!result.valid);

    let result = angle.validate(&payload(json!({"angle": 10.0, "timestamp": 12345})));
    assert!(!result.valid);

    let result = alert.validate(&payload(json!({
        "alert_type": "intrusion",
        "severity": "low",
        "timestamp": "2026-07-01T12:00:00Z"
    })));
    assert!(result.valid);
}
