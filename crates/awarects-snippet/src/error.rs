use std::time::Duration;

/// Errors that can occur on a device event channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] awarects_transport::TransportError),

    /// Line framing error.
    #[error("frame error: {0}")]
    Frame(#[from] awarects_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session handshake with the agent failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// No matching event arrived within the wait budget.
    #[error("no {events} event for callback {callback_id} within {timeout:?}")]
    Timeout {
        callback_id: String,
        events: String,
        timeout: Duration,
    },

    /// The agent did not answer an RPC in time.
    #[error("rpc {method} got no response within {timeout:?}")]
    RpcTimeout { method: String, timeout: Duration },

    /// The agent reported a synchronous failure for the operation.
    #[error("remote {method} failed: {message}")]
    Remote { method: String, message: String },

    /// The agent sent something that does not follow the protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The agent connection is gone.
    #[error("device disconnected: {0}")]
    Disconnected(String),
}

impl ChannelError {
    /// True for both event-wait and RPC timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ChannelError::Timeout { .. } | ChannelError::RpcTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
