use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::channel::{CallbackHandle, EventChannel};
use crate::error::{ChannelError, Result};
use crate::handler::{EventSink, RpcCall, RpcHandler};
use crate::mailbox::EventMailbox;
use crate::protocol::SnippetEvent;

/// In-process event channel that dispatches straight to an [`RpcHandler`].
///
/// Same callback and event semantics as a connected [`crate::SnippetClient`],
/// without a socket in between.
pub struct LocalChannel<H> {
    device_id: String,
    handler: H,
    mailbox: Arc<EventMailbox>,
    uid: i64,
    next_callback: AtomicU64,
}

impl<H: RpcHandler> LocalChannel<H> {
    pub fn new(device_id: impl Into<String>, handler: H) -> Self {
        Self::with_uid(device_id, handler, 1)
    }

    /// Use `uid` as the callback id prefix.
    pub fn with_uid(device_id: impl Into<String>, handler: H, uid: i64) -> Self {
        Self {
            device_id: device_id.into(),
            handler,
            mailbox: Arc::new(EventMailbox::new()),
            uid,
            next_callback: AtomicU64::new(1),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn mailbox(&self) -> &Arc<EventMailbox> {
        &self.mailbox
    }

    fn dispatch(&self, method: &str, params: &[Value], callback_id: Option<&str>) -> Result<Value> {
        let events: Arc<dyn EventSink> = self.mailbox.clone();
        self.handler
            .handle(RpcCall {
                method,
                params,
                callback_id,
                events,
            })
            .map_err(|message| ChannelError::Remote {
                method: method.to_string(),
                message,
            })
    }
}

impl<H: RpcHandler> EventChannel for LocalChannel<H> {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.dispatch(method, &params, None)
    }

    fn invoke(&self, method: &str, params: Vec<Value>) -> Result<CallbackHandle> {
        if !self.handler.is_async(method) {
            return Err(ChannelError::Protocol(format!(
                "{method} is not an asynchronous method"
            )));
        }
        let n = self.next_callback.fetch_add(1, Ordering::Relaxed);
        let handle = CallbackHandle::new(format!("{}-{n}", self.uid));
        self.dispatch(method, &params, Some(handle.id()))?;
        debug!(device = %self.device_id, method, callback = %handle, "async call dispatched");
        Ok(handle)
    }

    fn wait_any(
        &self,
        handle: &CallbackHandle,
        names: &[&str],
        timeout: Duration,
    ) -> Result<SnippetEvent> {
        self.mailbox.wait(handle.id(), names, timeout)
    }

    fn release(&self, handle: &CallbackHandle) -> usize {
        self.mailbox.clear(handle.id())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    struct Echo;

    impl RpcHandler for Echo {
        fn is_async(&self, method: &str) -> bool {
            method == "startEcho"
        }

        fn handle(&self, call: RpcCall<'_>) -> std::result::Result<Value, String> {
            match call.method {
                "echo" => Ok(call.param(0).clone()),
                "startEcho" => {
                    let mut data = Map::new();
                    data.insert("value".to_string(), call.param(0).clone());
                    call.emit("echoed", data);
                    Ok(Value::Null)
                }
                other => Err(format!("unknown method {other}")),
            }
        }
    }

    #[test]
    fn sync_call_dispatches() {
        let channel = LocalChannel::new("dut", Echo);
        assert_eq!(channel.call("echo", vec![json!(5)]).unwrap(), json!(5));
        assert_eq!(channel.device_id(), "dut");
    }

    #[test]
    fn async_call_posts_to_own_callback() {
        let channel = LocalChannel::with_uid("dut", Echo, 4);
        let first = channel.invoke("startEcho", vec![json!("a")]).unwrap();
        let second = channel.invoke("startEcho", vec![json!("b")]).unwrap();
        assert_eq!(first.id(), "4-1");
        assert_eq!(second.id(), "4-2");

        let event = channel
            .wait(&second, "echoed", Duration::from_millis(10))
            .unwrap();
        assert_eq!(event.get_str("value"), Some("b"));
        assert_eq!(channel.mailbox().pending(first.id()), 1);
    }

    #[test]
    fn release_drops_queued_events() {
        let channel = LocalChannel::new("dut", Echo);
        let handle = channel.invoke("startEcho", vec![json!("a")]).unwrap();
        assert_eq!(channel.release(&handle), 1);
        assert_eq!(channel.mailbox().pending(handle.id()), 0);
        assert_eq!(channel.release(&handle), 0);
        assert!(channel
            .wait(&handle, "echoed", Duration::from_millis(10))
            .unwrap_err()
            .is_timeout());
    }

    #[test]
    fn handler_error_is_remote_error() {
        let channel = LocalChannel::new("dut", Echo);
        assert!(matches!(
            channel.call("bogus", vec![]),
            Err(ChannelError::Remote { .. })
        ));
    }

    #[test]
    fn invoke_rejects_sync_methods() {
        let channel = LocalChannel::new("dut", Echo);
        assert!(matches!(
            channel.invoke("echo", vec![]),
            Err(ChannelError::Protocol(_))
        ));
    }
}
