use std::sync::Arc;

use serde_json::Value;

use crate::protocol::SnippetEvent;

/// Destination for events an agent-side handler posts.
pub trait EventSink: Send + Sync {
    fn post(&self, event: SnippetEvent);
}

/// One dispatched remote operation, as seen by an [`RpcHandler`].
pub struct RpcCall<'a> {
    pub method: &'a str,
    pub params: &'a [Value],
    /// Set for asynchronous methods: events for this call must carry it.
    pub callback_id: Option<&'a str>,
    /// Where events for this connection go.
    pub events: Arc<dyn EventSink>,
}

impl RpcCall<'_> {
    /// Positional parameter, or `Value::Null` when absent.
    pub fn param(&self, index: usize) -> &Value {
        self.params.get(index).unwrap_or(&Value::Null)
    }

    /// Post an event for this call's callback id.
    ///
    /// Calls without a callback id drop the event.
    pub fn emit(&self, name: &str, data: serde_json::Map<String, Value>) {
        if let Some(callback_id) = self.callback_id {
            let mut event = SnippetEvent::new(callback_id, name);
            event.data = data;
            self.events.post(event);
        }
    }
}

/// Agent-side implementation of the remote operations.
///
/// The simulator implements this; [`crate::SnippetServer`] and
/// [`crate::LocalChannel`] dispatch to it.
pub trait RpcHandler: Send + Sync {
    /// True when `method` answers through events and needs a callback id.
    fn is_async(&self, method: &str) -> bool;

    /// Execute one call. `Err` carries the agent's failure message.
    fn handle(&self, call: RpcCall<'_>) -> std::result::Result<Value, String>;
}

impl<H: RpcHandler + ?Sized> RpcHandler for Arc<H> {
    fn is_async(&self, method: &str) -> bool {
        (**self).is_async(method)
    }

    fn handle(&self, call: RpcCall<'_>) -> std::result::Result<Value, String> {
        (**self).handle(call)
    }
}
