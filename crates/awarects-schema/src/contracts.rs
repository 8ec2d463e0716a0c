//! Built-in contracts for the events a Wi-Fi Aware agent posts.
//!
//! These describe the `data` object of each event. They are deliberately
//! permissive about extra keys; enable strict mode to forbid those.

use serde_json::{json, Value};

/// Byte arrays arrive as signed or unsigned byte integers, or as a string.
fn byte_array() -> Value {
    json!({
        "oneOf": [
            { "type": "string" },
            {
                "type": "array",
                "items": { "type": "integer", "minimum": -128, "maximum": 255 }
            }
        ]
    })
}

fn discovery_result() -> Value {
    json!({
        "type": "object",
        "properties": {
            "callbackName": {
                "enum": [
                    "onPublishStarted",
                    "onSubscribeStarted",
                    "onSessionConfigUpdated",
                    "onSessionConfigFailed",
                    "onSessionTerminated"
                ]
            },
            "isSessionInitialized": { "type": "boolean" }
        },
        "required": ["callbackName"]
    })
}

fn service_discovered(ranged: bool) -> Value {
    let mut required = vec!["peerId", "serviceSpecificInfo", "matchFilter"];
    if ranged {
        required.push("distanceMm");
    }
    json!({
        "type": "object",
        "properties": {
            "peerId": { "type": "integer" },
            "serviceSpecificInfo": byte_array(),
            "matchFilter": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "value": byte_array() },
                    "required": ["value"]
                }
            },
            "distanceMm": { "type": "integer", "minimum": 0 },
            "pairedAlias": { "type": ["string", "null"] }
        },
        "required": required
    })
}

fn message_send_result() -> Value {
    json!({
        "type": "object",
        "properties": {
            "callbackName": { "enum": ["onMessageSendSucceeded", "onMessageSendFailed"] },
            "messageId": { "type": "integer" }
        },
        "required": ["callbackName", "messageId"]
    })
}

fn message_received() -> Value {
    json!({
        "type": "object",
        "properties": {
            "peerId": { "type": "integer" },
            "receivedMessage": byte_array()
        },
        "required": ["peerId", "receivedMessage"]
    })
}

fn network_callback() -> Value {
    json!({
        "type": "object",
        "properties": {
            "callbackName": { "type": "string" },
            "network": { "type": ["object", "string", "null"] },
            "networkCapabilities": { "type": ["object", "string", "null"] },
            "transportInfoClassName": { "type": "string" }
        },
        "required": ["callbackName"]
    })
}

/// Every built-in contract as `(event name, schema)`.
pub fn builtin() -> Vec<(&'static str, Value)> {
    vec![
        ("discoveryResult", discovery_result()),
        ("onServiceDiscovered", service_discovered(false)),
        ("onServiceDiscoveredWithinRange", service_discovered(true)),
        ("messageSendResult", message_send_result()),
        ("onMessageReceived", message_received()),
        ("NetworkCallback", network_callback()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_compiles() {
        for (name, schema) in builtin() {
            assert!(
                jsonschema::validator_for(&schema).is_ok(),
                "contract for {name} does not compile"
            );
        }
    }

    #[test]
    fn byte_array_accepts_java_and_string_forms() {
        let validator = jsonschema::validator_for(&byte_array()).unwrap();
        assert!(validator.is_valid(&json!([1, -1, 200])));
        assert!(validator.is_valid(&json!("text")));
        assert!(!validator.is_valid(&json!([300])));
        assert!(!validator.is_valid(&json!({"value": 1})));
    }
}
