use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use awarects_frame::{FrameError, LineConfig, LineReader, LineWriter, DEFAULT_MAX_LINE};
use awarects_transport::{DeviceStream, TcpEndpoint};
use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};
use crate::handler::{EventSink, RpcCall, RpcHandler};
use crate::handshake::{handshake_server, send_json, HandshakeConfig};
use crate::protocol::{RpcRequest, RpcResponse, SnippetEvent};

/// Agent side of the snippet protocol, serving an [`RpcHandler`] over TCP.
///
/// Each accepted connection gets a fresh session uid; asynchronous calls on
/// it get callback ids of the form `<uid>-<n>`.
pub struct SnippetServer {
    endpoint: TcpEndpoint,
    handler: Arc<dyn RpcHandler>,
    handshake_config: HandshakeConfig,
    next_uid: AtomicI64,
}

impl SnippetServer {
    /// Bind to `addr` (port 0 picks an ephemeral port).
    pub fn bind(addr: &str, handler: Arc<dyn RpcHandler>) -> Result<Self> {
        Ok(Self {
            endpoint: TcpEndpoint::bind(addr)?,
            handler,
            handshake_config: HandshakeConfig::default(),
            next_uid: AtomicI64::new(1),
        })
    }

    /// Override handshake config.
    pub fn with_handshake_config(mut self, config: HandshakeConfig) -> Self {
        self.handshake_config = config;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Accept one host connection and serve it until the host disconnects.
    pub fn serve_one(&self) -> Result<()> {
        let stream = self.endpoint.accept()?;
        let reader_stream = stream.try_clone()?;

        let line_config = LineConfig {
            max_line_size: self.handshake_config.max_handshake_line,
            read_timeout: Some(self.handshake_config.timeout),
            write_timeout: Some(self.handshake_config.timeout),
        };
        let mut reader = LineReader::with_config_device(reader_stream, line_config.clone())?;
        let mut writer = LineWriter::with_config_device(stream, line_config)?;

        let uid = self.next_uid.fetch_add(1, Ordering::Relaxed);
        handshake_server(&mut reader, &mut writer, uid, &self.handshake_config)?;
        reader.set_max_line_size(DEFAULT_MAX_LINE);
        writer.set_max_line_size(DEFAULT_MAX_LINE);
        reader.get_ref().set_read_timeout(None)?;
        info!(uid, "host session opened");

        let sink = Arc::new(ConnectionSink {
            uid,
            writer: Mutex::new(writer),
        });
        serve_connection(self.handler.as_ref(), &mut reader, &sink, uid)
    }

    /// Serve exactly one connection on a background thread.
    pub fn spawn_one(self) -> Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name(format!("snippet-server-{}", self.local_addr().port()))
            .spawn(move || self.serve_one())
            .map_err(|e| ChannelError::Transport(e.into()))
    }
}

/// Writes events for one connection, shared with handler state.
struct ConnectionSink {
    uid: i64,
    writer: Mutex<LineWriter<DeviceStream>>,
}

impl ConnectionSink {
    fn send<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        send_json(&mut writer, value)
    }
}

impl EventSink for ConnectionSink {
    fn post(&self, event: SnippetEvent) {
        if let Err(err) = self.send(&event) {
            warn!(uid = self.uid, name = %event.name, %err, "failed to push event to host");
        }
    }
}

fn serve_connection(
    handler: &dyn RpcHandler,
    reader: &mut LineReader<DeviceStream>,
    sink: &Arc<ConnectionSink>,
    uid: i64,
) -> Result<()> {
    let callbacks = AtomicU64::new(1);
    loop {
        let line = match reader.read_line() {
            Ok(line) => line,
            Err(FrameError::ConnectionClosed) => {
                info!(uid, "host session closed");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let request: RpcRequest = match serde_json::from_slice(&line.payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(uid, %err, "discarding malformed request");
                continue;
            }
        };

        let callback_id = handler
            .is_async(&request.method)
            .then(|| format!("{uid}-{}", callbacks.fetch_add(1, Ordering::Relaxed)));
        debug!(uid, id = request.id, method = %request.method, callback = ?callback_id, "dispatching");

        let events: Arc<dyn EventSink> = sink.clone();
        let outcome = handler.handle(RpcCall {
            method: &request.method,
            params: &request.params,
            callback_id: callback_id.as_deref(),
            events,
        });

        let response = match outcome {
            Ok(result) => RpcResponse {
                id: request.id,
                result,
                callback: callback_id,
                error: None,
            },
            Err(message) => RpcResponse {
                id: request.id,
                result: serde_json::Value::Null,
                callback: None,
                error: Some(message),
            },
        };
        sink.send(&response)?;
    }
}
