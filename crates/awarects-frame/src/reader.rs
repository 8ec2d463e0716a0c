use std::io::{ErrorKind, Read};

use awarects_transport::DeviceStream;
use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_line, Line, LineConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete lines from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete lines.
/// Bytes already buffered survive a read timeout, so a caller may retry
/// `read_line` after `FrameError::is_timeout`.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    config: LineConfig,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete line (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_line(&mut self) -> Result<Line> {
        loop {
            if let Some(line) = decode_line(&mut self.buf, self.config.max_line_size)? {
                trace!(len = line.payload.len(), "decoded line");
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum line size for subsequent decoding.
    pub fn set_max_line_size(&mut self, max_line_size: usize) {
        self.config.max_line_size = max_line_size;
    }

    /// Current line reader configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }
}

impl LineReader<DeviceStream> {
    /// Create a line reader for `DeviceStream` and apply read timeout from config.
    pub fn with_config_device(inner: DeviceStream, config: LineConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: awarects_transport::TransportError) -> FrameError {
    match err {
        awarects_transport::TransportError::Io(io)
        | awarects_transport::TransportError::Accept(io) => FrameError::Io(io),
        awarects_transport::TransportError::Bind { source, .. }
        | awarects_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
