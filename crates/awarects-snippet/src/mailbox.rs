use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ChannelError, Result};
use crate::handler::EventSink;
use crate::protocol::SnippetEvent;

/// Default number of undelivered events kept per callback id.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Per-device store of undelivered events, keyed by callback id.
///
/// A listener posts events as they arrive; waiters take the oldest queued
/// event whose name they asked for. An event is handed out at most once,
/// and only to a wait on its own callback id.
pub struct EventMailbox {
    state: Mutex<MailboxState>,
    ready: Condvar,
    capacity: usize,
}

#[derive(Default)]
struct MailboxState {
    queues: HashMap<String, VecDeque<SnippetEvent>>,
    closed: Option<String>,
}

impl EventMailbox {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    /// Create a mailbox holding at most `capacity` events per callback id.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MailboxState::default()),
            ready: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Queue an event and wake waiters. Events posted after `close` are dropped.
    pub fn post(&self, event: SnippetEvent) {
        let mut state = self.lock();
        if state.closed.is_some() {
            debug!(callback_id = %event.callback_id, name = %event.name, "mailbox closed, dropping event");
            return;
        }
        let queue = state.queues.entry(event.callback_id.clone()).or_default();
        if queue.len() >= self.capacity {
            if let Some(dropped) = queue.pop_front() {
                warn!(
                    callback_id = %dropped.callback_id,
                    name = %dropped.name,
                    capacity = self.capacity,
                    "mailbox full, dropping oldest event"
                );
            }
        }
        queue.push_back(event);
        drop(state);
        self.ready.notify_all();
    }

    /// Block until an event named in `names` arrives for `callback_id`.
    pub fn wait(
        &self,
        callback_id: &str,
        names: &[&str],
        timeout: Duration,
    ) -> Result<SnippetEvent> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(event) = take_first(&mut state, callback_id, names) {
                return Ok(event);
            }
            if let Some(reason) = &state.closed {
                return Err(ChannelError::Disconnected(reason.clone()));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ChannelError::Timeout {
                    callback_id: callback_id.to_string(),
                    events: names.join("|"),
                    timeout,
                });
            }
            state = self
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Number of undelivered events for a callback id.
    pub fn pending(&self, callback_id: &str) -> usize {
        self.lock().queues.get(callback_id).map_or(0, VecDeque::len)
    }

    /// Drop every undelivered event for a callback id.
    pub fn clear(&self, callback_id: &str) -> usize {
        self.lock()
            .queues
            .remove(callback_id)
            .map_or(0, |queue| queue.len())
    }

    /// Fail current and future waits with `Disconnected`, once queued events run out.
    pub fn close(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        if state.closed.is_none() {
            state.closed = Some(reason.into());
        }
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventMailbox {
    fn post(&self, event: SnippetEvent) {
        EventMailbox::post(self, event);
    }
}

fn take_first(state: &mut MailboxState, callback_id: &str, names: &[&str]) -> Option<SnippetEvent> {
    let queue = state.queues.get_mut(callback_id)?;
    let pos = queue
        .iter()
        .position(|event| names.contains(&event.name.as_str()))?;
    queue.remove(pos)
}
