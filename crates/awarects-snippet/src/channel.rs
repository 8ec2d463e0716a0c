use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::protocol::SnippetEvent;

/// Handle returned by an asynchronous operation; events for it carry this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackHandle {
    id: String,
}

impl CallbackHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Per-device "invoke and wait" interface.
///
/// Implemented by [`crate::SnippetClient`] for real agents and by
/// [`crate::LocalChannel`] for in-process handlers. Implementations are
/// shared across threads, so one device can be driven while another waits.
pub trait EventChannel: Send + Sync {
    /// Name used for this device in logs and reports.
    fn device_id(&self) -> &str;

    /// Synchronous operation: returns the agent's result.
    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value>;

    /// Asynchronous operation: returns the callback handle its events will carry.
    fn invoke(&self, method: &str, params: Vec<Value>) -> Result<CallbackHandle>;

    /// Wait for the first event for `handle` whose name is in `names`.
    ///
    /// The returned event is consumed. Other events stay queued.
    fn wait_any(
        &self,
        handle: &CallbackHandle,
        names: &[&str],
        timeout: Duration,
    ) -> Result<SnippetEvent>;

    /// Forget a callback the host is done with, dropping its undelivered events.
    ///
    /// Returns how many queued events were discarded.
    fn release(&self, handle: &CallbackHandle) -> usize;

    /// Wait for one named event.
    fn wait(&self, handle: &CallbackHandle, name: &str, timeout: Duration) -> Result<SnippetEvent> {
        self.wait_any(handle, &[name], timeout)
    }
}
