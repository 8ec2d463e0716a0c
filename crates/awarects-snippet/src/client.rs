use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use awarects_frame::{FrameError, LineReader, LineWriter, DEFAULT_MAX_LINE};
use awarects_transport::DeviceStream;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::channel::{CallbackHandle, EventChannel};
use crate::error::{ChannelError, Result};
use crate::handshake::{send_json, HandshakeResult};
use crate::mailbox::{EventMailbox, DEFAULT_MAILBOX_CAPACITY};
use crate::protocol::{AgentMessage, RpcRequest, RpcResponse, SnippetEvent};

/// Runtime behavior of a connected [`SnippetClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long to wait for the agent to answer one RPC.
    pub rpc_timeout: Duration,
    /// Maximum line size accepted from and sent to the agent.
    pub max_line_size: usize,
    /// Undelivered events kept per callback id.
    pub mailbox_capacity: usize,
    /// Listener read timeout; bounds how long close waits for the thread.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(30),
            max_line_size: DEFAULT_MAX_LINE,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Default)]
struct PendingCalls {
    waiters: HashMap<u64, mpsc::Sender<RpcResponse>>,
    closed: Option<String>,
}

struct Shared {
    device_id: String,
    mailbox: Arc<EventMailbox>,
    pending: Mutex<PendingCalls>,
    closing: AtomicBool,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, PendingCalls> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Event channel to one device agent over a connected stream.
///
/// A dedicated listener thread reads every agent line. Responses are routed
/// to the waiting caller by request id; events go to the device mailbox.
pub struct SnippetClient {
    shared: Arc<Shared>,
    writer: Mutex<LineWriter<DeviceStream>>,
    control: DeviceStream,
    listener: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    uid: i64,
    config: ClientConfig,
}

impl SnippetClient {
    /// Build a client from a handshaken reader/writer pair and start its listener.
    pub fn from_parts(
        device_id: impl Into<String>,
        mut reader: LineReader<DeviceStream>,
        mut writer: LineWriter<DeviceStream>,
        handshake: HandshakeResult,
        config: ClientConfig,
    ) -> Result<Self> {
        let device_id = device_id.into();
        reader.set_max_line_size(config.max_line_size);
        writer.set_max_line_size(config.max_line_size);
        reader
            .get_ref()
            .set_read_timeout(Some(config.poll_interval))?;
        writer
            .get_ref()
            .set_write_timeout(Some(config.rpc_timeout))?;
        let control = writer.get_ref().try_clone()?;

        let shared = Arc::new(Shared {
            device_id: device_id.clone(),
            mailbox: Arc::new(EventMailbox::with_capacity(config.mailbox_capacity)),
            pending: Mutex::new(PendingCalls::default()),
            closing: AtomicBool::new(false),
        });

        let listener_shared = Arc::clone(&shared);
        let listener = thread::Builder::new()
            .name(format!("snippet-{device_id}"))
            .spawn(move || listen(reader, listener_shared))
            .map_err(|e| ChannelError::Transport(e.into()))?;

        debug!(device = %device_id, uid = handshake.uid, resumed = handshake.resumed, "snippet client ready");
        Ok(Self {
            shared,
            writer: Mutex::new(writer),
            control,
            listener: Mutex::new(Some(listener)),
            next_id: AtomicU64::new(1),
            uid: handshake.uid,
            config,
        })
    }

    /// Agent session uid from the handshake.
    pub fn uid(&self) -> i64 {
        self.uid
    }

    /// The device mailbox.
    pub fn mailbox(&self) -> &Arc<EventMailbox> {
        &self.shared.mailbox
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stop the listener and shut the connection down. Idempotent.
    pub fn close(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        if let Err(err) = self.control.shutdown() {
            debug!(device = %self.shared.device_id, %err, "shutdown on close failed");
        }
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(device = %self.shared.device_id, "snippet listener panicked");
            }
        }
    }

    fn request(&self, method: &str, params: Vec<Value>) -> Result<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        {
            let mut pending = self.shared.pending();
            if let Some(reason) = &pending.closed {
                return Err(ChannelError::Disconnected(reason.clone()));
            }
            pending.waiters.insert(id, tx);
        }

        let request = RpcRequest {
            id,
            method: method.to_string(),
            params,
        };
        trace!(device = %self.shared.device_id, id, method, "rpc request");
        let sent = {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            send_json(&mut writer, &request)
        };
        if let Err(err) = sent {
            self.shared.pending().waiters.remove(&id);
            return Err(err);
        }

        match rx.recv_timeout(self.config.rpc_timeout) {
            Ok(response) => Ok(response),
            Err(RecvTimeoutError::Timeout) => {
                self.shared.pending().waiters.remove(&id);
                Err(ChannelError::RpcTimeout {
                    method: method.to_string(),
                    timeout: self.config.rpc_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                let reason = self
                    .shared
                    .pending()
                    .closed
                    .clone()
                    .unwrap_or_else(|| "listener stopped".to_string());
                Err(ChannelError::Disconnected(reason))
            }
        }
    }
}

impl EventChannel for SnippetClient {
    fn device_id(&self) -> &str {
        &self.shared.device_id
    }

    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let response = self.request(method, params)?;
        if let Some(message) = response.error {
            return Err(ChannelError::Remote {
                method: method.to_string(),
                message,
            });
        }
        Ok(response.result)
    }

    fn invoke(&self, method: &str, params: Vec<Value>) -> Result<CallbackHandle> {
        let response = self.request(method, params)?;
        if let Some(message) = response.error {
            return Err(ChannelError::Remote {
                method: method.to_string(),
                message,
            });
        }
        let callback = response.callback.ok_or_else(|| {
            ChannelError::Protocol(format!("{method} returned no callback id"))
        })?;
        debug!(device = %self.shared.device_id, method, callback = %callback, "async rpc started");
        Ok(CallbackHandle::new(callback))
    }

    fn wait_any(
        &self,
        handle: &CallbackHandle,
        names: &[&str],
        timeout: Duration,
    ) -> Result<SnippetEvent> {
        let event = self.shared.mailbox.wait(handle.id(), names, timeout)?;
        debug!(device = %self.shared.device_id, callback = %handle, name = %event.name, "event received");
        Ok(event)
    }

    fn release(&self, handle: &CallbackHandle) -> usize {
        let dropped = self.shared.mailbox.clear(handle.id());
        if dropped > 0 {
            debug!(
                device = %self.shared.device_id,
                callback = %handle,
                dropped,
                "released callback with queued events"
            );
        }
        dropped
    }
}

impl Drop for SnippetClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SnippetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnippetClient")
            .field("device_id", &self.shared.device_id)
            .field("uid", &self.uid)
            .field("transport", &self.control.transport_name())
            .finish()
    }
}

fn listen(mut reader: LineReader<DeviceStream>, shared: Arc<Shared>) {
    let reason = loop {
        if shared.closing.load(Ordering::SeqCst) {
            break "client closed".to_string();
        }
        match reader.read_line() {
            Ok(line) => match AgentMessage::parse(&line.payload) {
                Ok(AgentMessage::Response(response)) => route_response(&shared, response),
                Ok(AgentMessage::Event(event)) => {
                    trace!(device = %shared.device_id, callback = %event.callback_id, name = %event.name, "event posted");
                    shared.mailbox.post(event);
                }
                Err(err) => {
                    warn!(device = %shared.device_id, %err, "discarding malformed agent message");
                }
            },
            Err(err) if err.is_timeout() => continue,
            Err(FrameError::ConnectionClosed) => break "agent closed the connection".to_string(),
            Err(err) => break format!("read failed: {err}"),
        }
    };

    debug!(device = %shared.device_id, %reason, "snippet listener stopped");
    shared.mailbox.close(reason.clone());
    let mut pending = shared.pending();
    pending.closed = Some(reason);
    pending.waiters.clear();
}

fn route_response(shared: &Shared, response: RpcResponse) {
    let waiter = shared.pending().waiters.remove(&response.id);
    match waiter {
        Some(tx) => {
            // The caller may have timed out between lookup and send.
            let _ = tx.send(response);
        }
        None => {
            warn!(device = %shared.device_id, id = response.id, "response for unknown or expired request");
        }
    }
}
