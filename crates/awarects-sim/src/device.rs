use std::sync::{Mutex, MutexGuard, PoisonError};

use awarects_snippet::{bytes_from_value, RpcCall, RpcHandler};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::air::{Role, SessionKey, SessionSpec, SimAir};
use crate::faults::SimFaults;
use crate::wire;

const ASYNC_METHODS: [&str; 4] = [
    wire::ATTACH,
    wire::PUBLISH,
    wire::SUBSCRIBE,
    wire::REQUEST_NETWORK,
];

/// One simulated device: the agent side of a single phone.
pub struct SimDevice {
    name: String,
    air: SimAir,
    faults: SimFaults,
    attach_id: Mutex<Option<String>>,
}

impl SimDevice {
    pub(crate) fn new(name: &str, air: SimAir, faults: SimFaults) -> Self {
        Self {
            name: name.to_string(),
            air,
            faults,
            attach_id: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faults(&self) -> SimFaults {
        self.faults
    }

    pub fn is_attached(&self) -> bool {
        self.attached().is_some()
    }

    fn attached(&self) -> Option<String> {
        self.attach_slot().clone()
    }

    fn attach_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.attach_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_key(&self, id: &Value) -> Result<SessionKey, String> {
        let id = id.as_str().ok_or("session id must be a string")?;
        Ok(SessionKey {
            device: self.name.clone(),
            id: id.to_string(),
        })
    }

    fn attach(&self, call: &RpcCall<'_>) -> Result<Value, String> {
        let callback_id = require_callback(call)?;
        if self.faults.attach_fails {
            call.emit(wire::ON_ATTACH_FAILED, Map::new());
            return Ok(Value::Null);
        }
        *self.attach_slot() = Some(callback_id.to_string());
        call.emit(wire::ON_ATTACHED, Map::new());
        Ok(Value::Null)
    }

    fn detach(&self) -> Value {
        if self.attach_slot().take().is_some() {
            self.air.clear_device(&self.name);
        }
        Value::Null
    }

    fn start_session(&self, call: &RpcCall<'_>, publish: bool) -> Result<Value, String> {
        let callback_id = require_callback(call)?;
        let attach = self.attached().ok_or("not attached")?;
        if call.param(0).as_str() != Some(attach.as_str()) {
            return Err(format!("unknown attach session {}", call.param(0)));
        }
        let spec = parse_spec(call.param(1), publish)?;

        if self.faults.config_fails {
            let mut data = Map::new();
            data.insert("callbackName".into(), json!(wire::SESSION_CONFIG_FAILED));
            data.insert("isSessionInitialized".into(), json!(false));
            call.emit(wire::DISCOVERY_RESULT, data);
            return Ok(Value::Null);
        }

        let started = if publish {
            wire::PUBLISH_STARTED
        } else {
            wire::SUBSCRIBE_STARTED
        };
        let mut data = Map::new();
        data.insert("callbackName".into(), json!(started));
        data.insert("isSessionInitialized".into(), json!(true));
        call.emit(wire::DISCOVERY_RESULT, data);

        let key = SessionKey {
            device: self.name.clone(),
            id: callback_id.to_string(),
        };
        debug!(device = %self.name, session = callback_id, service = %spec.service_name, publish, "session started");
        self.air
            .open_session(key, spec, call.events.clone(), self.faults)
            .deliver();
        Ok(Value::Null)
    }

    fn send_message(&self, call: &RpcCall<'_>) -> Result<Value, String> {
        let from = self.session_key(call.param(0))?;
        let peer_id = call.param(1).as_i64().ok_or("peer id must be an integer")?;
        let message_id = call.param(2).as_i64().ok_or("message id must be an integer")?;
        let text = call.param(3).as_str().ok_or("message must be a string")?;
        self.air
            .send_message(&from, peer_id, message_id, text.as_bytes())?
            .deliver();
        Ok(Value::Null)
    }

    fn create_specifier(&self, call: &RpcCall<'_>) -> Result<Value, String> {
        let from = self.session_key(call.param(0))?;
        let peer_id = call.param(1).as_i64().ok_or("peer id must be an integer")?;
        Ok(Value::String(self.air.create_specifier(&from, peer_id)?))
    }

    fn request_network(&self, call: &RpcCall<'_>) -> Result<Value, String> {
        let callback_id = require_callback(call)?;
        self.air
            .request_network(
                &self.name,
                callback_id,
                call.param(0),
                call.events.clone(),
                self.faults,
            )?
            .deliver();
        Ok(Value::Null)
    }
}

impl RpcHandler for SimDevice {
    fn is_async(&self, method: &str) -> bool {
        ASYNC_METHODS.contains(&method)
    }

    fn handle(&self, call: RpcCall<'_>) -> Result<Value, String> {
        debug!(device = %self.name, method = call.method, "sim call");
        match call.method {
            wire::IS_AVAILABLE => Ok(Value::Bool(!self.faults.unavailable)),
            wire::IS_PAIRING_SUPPORTED => Ok(Value::Bool(true)),
            wire::ATTACH => self.attach(&call),
            wire::IS_SESSION_ATTACHED => Ok(Value::Bool(self.is_attached())),
            wire::DETACH => Ok(self.detach()),
            wire::PUBLISH => self.start_session(&call, true),
            wire::SUBSCRIBE => self.start_session(&call, false),
            wire::CLOSE_DISCOVER_SESSION => {
                let key = self.session_key(call.param(0))?;
                if !self.air.close_session(&key) {
                    debug!(device = %self.name, session = %key.id, "close of unknown session");
                }
                Ok(Value::Null)
            }
            wire::CLOSE_ALL => {
                self.detach();
                self.air.clear_device(&self.name);
                Ok(Value::Null)
            }
            wire::SEND_MESSAGE => self.send_message(&call),
            wire::CREATE_NETWORK_SPECIFIER => self.create_specifier(&call),
            wire::REQUEST_NETWORK => self.request_network(&call),
            wire::UNREGISTER_NETWORK => {
                let id = call.param(0).as_str().ok_or("request id must be a string")?;
                if !self.air.unregister_network(&self.name, id) {
                    debug!(device = %self.name, request = id, "unregister of unknown request");
                }
                Ok(Value::Null)
            }
            other => {
                warn!(device = %self.name, method = other, "unknown method");
                Err(format!("unknown method {other}"))
            }
        }
    }
}

fn require_callback<'a>(call: &RpcCall<'a>) -> Result<&'a str, String> {
    call.callback_id
        .ok_or_else(|| format!("{} needs a callback id", call.method))
}

/// Read a publish or subscribe config in the agent's mapping.
fn parse_spec(config: &Value, publish: bool) -> Result<SessionSpec, String> {
    let service_name = config
        .get("service_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or("config needs a service_name")?
        .to_string();
    let ssi = match config.get("service_specific_info") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => bytes_from_value(value).ok_or("service_specific_info must be bytes")?,
    };
    let filter = match config.get("match_filter") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| bytes_from_value(entry).ok_or("match_filter entries must be bytes"))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err("match_filter must be a list".to_string()),
    };
    let role = if publish {
        Role::Publish {
            ranging: config
                .get("ranging_enabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    } else {
        Role::Subscribe {
            max_distance_mm: config.get("max_distance_mm").and_then(Value::as_i64),
        }
    };
    Ok(SessionSpec {
        service_name,
        ssi,
        filter,
        role,
    })
}
