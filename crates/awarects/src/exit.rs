use std::fmt;
use std::io;

use awarects_frame::FrameError;
use awarects_session::{AwareError, RunReport};
use awarects_snippet::ChannelError;
use awarects_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const CHECK_FAILED: i32 = 30;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => USAGE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidAddress(_) | TransportError::Unsupported(_) => {
            CliError::usage(format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::LineTooLong { .. } | FrameError::EmbeddedNewline(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Transport(err) => transport_error(context, err),
        ChannelError::Frame(err) => frame_error(context, err),
        ChannelError::Timeout { .. } | ChannelError::RpcTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ChannelError::Json(_) | ChannelError::Protocol(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ChannelError::HandshakeFailed(_) | ChannelError::Disconnected(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ChannelError::Remote { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn aware_error(context: &str, err: AwareError) -> CliError {
    match err {
        AwareError::Channel(err) => channel_error(context, err),
        AwareError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        AwareError::Config(_) => CliError::usage(format!("{context}: {err}")),
        AwareError::PayloadMismatch { .. } | AwareError::Model(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        AwareError::Internal(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

#[cfg(feature = "schema")]
pub fn schema_error(context: &str, err: awarects_schema::SchemaError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

/// Exit code for a finished run: devices unusable at setup is a failed check.
pub fn report_code(report: &RunReport) -> i32 {
    if report.passed() {
        SUCCESS
    } else if report.setup_error.is_some() {
        CHECK_FAILED
    } else {
        FAILURE
    }
}
