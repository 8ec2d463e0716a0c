//! Snippet wire messages.
//!
//! Host → agent: [`RpcRequest`]. Agent → host: [`RpcResponse`] (carries the
//! request `id`) or a pushed [`SnippetEvent`] (carries a `callbackId`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChannelError, Result};

/// A remote operation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// The agent's answer to one [`RpcRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Value,
    /// Callback id assigned to an asynchronous operation.
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A named event posted by the agent for one callback id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnippetEvent {
    #[serde(rename = "callbackId")]
    pub callback_id: String,
    pub name: String,
    /// Agent-side creation time in epoch milliseconds.
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl SnippetEvent {
    pub fn new(callback_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            callback_id: callback_id.into(),
            name: name.into(),
            time: 0,
            data: Map::new(),
        }
    }

    /// Builder-style data insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }

    /// Decode a byte-array field. See [`bytes_from_value`].
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.data.get(key).and_then(bytes_from_value)
    }

    /// True when `key` is present and not null.
    pub fn has(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|value| !value.is_null())
    }
}

/// Decode a byte array as agents serialize it.
///
/// Java agents emit `byte[]` as an array of signed integers (-128..=127);
/// unsigned 0..=255 is accepted as well, and a plain string is taken as its
/// UTF-8 bytes. Anything else yields `None`.
pub fn bytes_from_value(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(text) => Some(text.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let n = item.as_i64()?;
                if (-128..=255).contains(&n) {
                    Some(n as u8)
                } else {
                    None
                }
            })
            .collect(),
        _ => None,
    }
}

/// One line received from an agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    Response(RpcResponse),
    Event(SnippetEvent),
}

impl AgentMessage {
    /// Classify and decode one agent line.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(payload)?;
        let Value::Object(map) = &value else {
            return Err(ChannelError::Protocol(
                "agent message is not a JSON object".to_string(),
            ));
        };

        if map.contains_key("id") {
            Ok(Self::Response(serde_json::from_value(value)?))
        } else if map.contains_key("callbackId") {
            Ok(Self::Event(serde_json::from_value(value)?))
        } else {
            Err(ChannelError::Protocol(
                "agent message has neither 'id' nor 'callbackId'".to_string(),
            ))
        }
    }
}
