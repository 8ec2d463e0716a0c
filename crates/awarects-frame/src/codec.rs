use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Line delimiter.
pub const DELIMITER: u8 = b'\n';

/// Default maximum line size: 4 MiB.
pub const DEFAULT_MAX_LINE: usize = 4 * 1024 * 1024;

/// One complete message line, without its delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// The line payload.
    pub payload: Bytes,
}

impl Line {
    /// Create a new line.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this line (payload + delimiter).
    pub fn wire_size(&self) -> usize {
        self.payload.len() + 1
    }

    /// The payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Encode a payload as one line.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────┬──────┐
/// │ Payload (no '\n' inside) │ '\n' │
/// └──────────────────────────┴──────┘
/// ```
pub fn encode_line(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if let Some(pos) = payload.iter().position(|&b| b == DELIMITER) {
        return Err(FrameError::EmbeddedNewline(pos));
    }
    dst.reserve(payload.len() + 1);
    dst.put_slice(payload);
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Decode a line from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete line yet.
/// On success, consumes the line bytes (and delimiter) from the buffer.
/// A trailing `\r` is stripped.
pub fn decode_line(src: &mut BytesMut, max_line: usize) -> Result<Option<Line>> {
    let Some(pos) = src.iter().position(|&b| b == DELIMITER) else {
        if src.len() > max_line {
            return Err(FrameError::LineTooLong {
                size: src.len(),
                max: max_line,
            });
        }
        return Ok(None); // Need more data
    };

    if pos > max_line {
        return Err(FrameError::LineTooLong {
            size: pos,
            max: max_line,
        });
    }

    let mut payload = src.split_to(pos).freeze();
    src.advance(1);
    if payload.last() == Some(&b'\r') {
        payload.truncate(payload.len() - 1);
    }

    Ok(Some(Line { payload }))
}

/// Configuration for the line codec.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Maximum line size in bytes. Default: 4 MiB.
    pub max_line_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_size: DEFAULT_MAX_LINE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
