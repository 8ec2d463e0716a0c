/// Errors that can occur during line encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload contains a delimiter and would split into two lines.
    #[error("payload contains an embedded newline at byte {0}")]
    EmbeddedNewline(usize),

    /// The line exceeds the configured maximum size.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// An I/O error occurred while reading or writing lines.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete line was received.
    #[error("connection closed (incomplete line)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the error is a read/write timeout rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
