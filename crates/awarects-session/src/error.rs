use std::time::Duration;

use awarects_snippet::ChannelError;

/// Errors raised while orchestrating a two-device case.
///
/// Every variant is fatal for the current case; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum AwareError {
    /// An expected event did not arrive within its budget.
    #[error("{device}: no {what} within {timeout:?}")]
    Timeout {
        device: String,
        what: String,
        timeout: Duration,
    },

    /// An event arrived but reported a different outcome than expected.
    #[error("{device}: expected {expected}, got {actual}")]
    UnexpectedCallback {
        device: String,
        expected: String,
        actual: String,
    },

    /// An echoed payload or identifier differs from what was sent.
    #[error("{device}: {field} mismatch: expected {expected}, got {actual}")]
    PayloadMismatch {
        device: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// A device could not be brought to a usable state.
    #[error("{device}: setup failed: {reason}")]
    SetupFailure { device: String, reason: String },

    /// An operation was attempted in a state that does not allow it.
    #[error("{device}: cannot {operation} while {state}")]
    InvalidState {
        device: String,
        operation: String,
        state: String,
    },

    /// A peer handle was used outside the discovery session it was learned on.
    #[error("peer {peer_id} belongs to session {peer_session}, not {session}")]
    ForeignPeer {
        peer_id: i64,
        peer_session: String,
        session: String,
    },

    /// Event channel failure.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A session config cannot be expressed in the agent's format.
    #[error("model error: {0}")]
    Model(#[from] serde_json::Error),

    /// Run configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// An event failed its payload contract.
    #[cfg(feature = "schema")]
    #[error("schema violation: {0}")]
    Schema(#[from] awarects_schema::SchemaError),

    /// A worker thread panicked or similar internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AwareError {
    /// True when later cases cannot run on the same devices either.
    ///
    /// A lost agent connection qualifies. A `SetupFailure` inside a case
    /// does not; the runner aborts on it only during class setup.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            AwareError::Channel(ChannelError::Disconnected(_))
                | AwareError::Channel(ChannelError::Transport(_))
                | AwareError::Channel(ChannelError::HandshakeFailed(_))
        )
    }

    /// True for event and RPC timeouts.
    pub fn is_timeout(&self) -> bool {
        match self {
            AwareError::Timeout { .. } => true,
            AwareError::Channel(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Short stable name of the error kind, for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AwareError::Timeout { .. } => "timeout",
            AwareError::UnexpectedCallback { .. } => "unexpected_callback",
            AwareError::PayloadMismatch { .. } => "payload_mismatch",
            AwareError::SetupFailure { .. } => "setup_failure",
            AwareError::InvalidState { .. } => "invalid_state",
            AwareError::ForeignPeer { .. } => "foreign_peer",
            AwareError::Channel(err) if err.is_timeout() => "timeout",
            AwareError::Channel(_) => "channel",
            AwareError::Model(_) => "model",
            AwareError::Config(_) => "config",
            #[cfg(feature = "schema")]
            AwareError::Schema(_) => "schema",
            AwareError::Internal(_) => "internal",
        }
    }

    /// Attach device context to a channel error, turning waits that ran out into `Timeout`.
    pub(crate) fn from_channel(device: &str, err: ChannelError) -> Self {
        match err {
            ChannelError::Timeout {
                events, timeout, ..
            } => AwareError::Timeout {
                device: device.to_string(),
                what: events,
                timeout,
            },
            ChannelError::RpcTimeout { method, timeout } => AwareError::Timeout {
                device: device.to_string(),
                what: format!("response to {method}"),
                timeout,
            },
            other => AwareError::Channel(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_timeout_becomes_timeout() {
        let err = AwareError::from_channel(
            "publisher",
            ChannelError::Timeout {
                callback_id: "1-1".to_string(),
                events: "onAttached|onAttachFailed".to_string(),
                timeout: Duration::from_secs(30),
            },
        );
        assert!(err.is_timeout());
        assert_eq!(err.kind(), "timeout");
        assert_eq!(
            err.to_string(),
            "publisher: no onAttached|onAttachFailed within 30s"
        );
    }

    #[test]
    fn remote_error_stays_channel() {
        let err = AwareError::from_channel(
            "subscriber",
            ChannelError::Remote {
                method: "wifiAwareDetach".to_string(),
                message: "unknown id".to_string(),
            },
        );
        assert!(matches!(err, AwareError::Channel(ChannelError::Remote { .. })));
        assert!(!err.aborts_run());
    }

    #[test]
    fn only_lost_connections_abort_run() {
        let setup = AwareError::SetupFailure {
            device: "publisher".to_string(),
            reason: "attach failed".to_string(),
        };
        assert!(!setup.aborts_run());
        let gone = AwareError::Channel(ChannelError::Disconnected("eof".to_string()));
        assert!(gone.aborts_run());

        let mismatch = AwareError::PayloadMismatch {
            device: "subscriber".to_string(),
            field: "serviceSpecificInfo".to_string(),
            expected: "a".to_string(),
            actual: "b".to_string(),
        };
        assert!(!mismatch.aborts_run());
        assert_eq!(mismatch.kind(), "payload_mismatch");
    }
}
