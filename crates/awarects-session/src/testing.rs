//! Scripted agent for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use awarects_snippet::{EventChannel, EventSink, LocalChannel, RpcCall, RpcHandler, SnippetEvent};
use serde_json::{Map, Value};

use crate::constants::method;
use crate::orchestrator::DeviceOrchestrator;

pub(crate) const SHORT: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Script {
    results: HashMap<String, Result<Value, String>>,
    events: HashMap<String, Vec<(String, Map<String, Value>)>>,
    calls: Vec<(String, Vec<Value>)>,
    callbacks: Vec<(String, Arc<dyn EventSink>)>,
}

/// Answers calls from a script and records them.
#[derive(Default)]
pub(crate) struct ScriptedAgent {
    script: Mutex<Script>,
}

impl ScriptedAgent {
    pub(crate) fn on_call(&self, method: &str, result: Value) -> &Self {
        let mut script = self.script.lock().unwrap();
        script.results.insert(method.to_string(), Ok(result));
        drop(script);
        self
    }

    pub(crate) fn fail_call(&self, method: &str, message: &str) -> &Self {
        let mut script = self.script.lock().unwrap();
        script
            .results
            .insert(method.to_string(), Err(message.to_string()));
        drop(script);
        self
    }

    /// Emit `name` with `data` on the callback of every later `method` invoke.
    pub(crate) fn on_invoke(&self, method: &str, name: &str, data: Value) -> &Self {
        let Value::Object(data) = data else {
            panic!("event data must be an object");
        };
        let mut script = self.script.lock().unwrap();
        script
            .events
            .entry(method.to_string())
            .or_default()
            .push((name.to_string(), data));
        drop(script);
        self
    }

    /// Post an event on the callback of the n-th async call (0-based).
    pub(crate) fn post(&self, nth_callback: usize, name: &str, data: Value) {
        let (id, sink) = {
            let script = self.script.lock().unwrap();
            let (id, sink) = &script.callbacks[nth_callback];
            (id.clone(), Arc::clone(sink))
        };
        let mut event = SnippetEvent::new(id, name);
        if let Value::Object(map) = data {
            event.data = map;
        }
        sink.post(event);
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script.calls.iter().map(|(m, _)| m.clone()).collect()
    }

    pub(crate) fn params(&self, method: &str) -> Option<Vec<Value>> {
        let script = self.script.lock().unwrap();
        script
            .calls
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }
}

impl RpcHandler for ScriptedAgent {
    fn is_async(&self, method: &str) -> bool {
        method::ASYNC.contains(&method)
    }

    fn handle(&self, call: RpcCall<'_>) -> Result<Value, String> {
        let (result, events) = {
            let mut script = self.script.lock().unwrap();
            script
                .calls
                .push((call.method.to_string(), call.params.to_vec()));
            if let Some(id) = call.callback_id {
                script.callbacks.push((id.to_string(), call.events.clone()));
            }
            let result = script
                .results
                .get(call.method)
                .cloned()
                .unwrap_or(Ok(Value::Null));
            let events = script.events.get(call.method).cloned().unwrap_or_default();
            (result, events)
        };
        for (name, data) in events {
            call.emit(&name, data);
        }
        result
    }
}

/// A scripted device behind an in-process channel.
pub(crate) fn scripted(device: &str) -> (Arc<ScriptedAgent>, Arc<dyn EventChannel>) {
    let agent = Arc::new(ScriptedAgent::default());
    let channel: Arc<dyn EventChannel> = Arc::new(LocalChannel::new(device, Arc::clone(&agent)));
    (agent, channel)
}

/// Orchestrator over a scripted device, waiting [`SHORT`] per event.
pub(crate) fn orchestrator(device: &str) -> (Arc<ScriptedAgent>, DeviceOrchestrator) {
    let (agent, channel) = scripted(device);
    (agent, DeviceOrchestrator::new(channel, SHORT))
}

/// Script a successful attach.
pub(crate) fn script_attach(agent: &ScriptedAgent) {
    agent
        .on_invoke(method::ATTACH, "onAttached", serde_json::json!({}))
        .on_call(method::IS_SESSION_ATTACHED, Value::Bool(true));
}

/// Script successful publish and subscribe starts.
pub(crate) fn script_sessions(agent: &ScriptedAgent) {
    agent
        .on_invoke(
            method::PUBLISH,
            "discoveryResult",
            serde_json::json!({"callbackName": "onPublishStarted", "isSessionInitialized": true}),
        )
        .on_invoke(
            method::SUBSCRIBE,
            "discoveryResult",
            serde_json::json!({"callbackName": "onSubscribeStarted", "isSessionInitialized": true}),
        );
}
