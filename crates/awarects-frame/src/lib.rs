//! Newline-delimited message framing for device agent connections.
//!
//! Every message on an agent connection is one line of UTF-8 JSON
//! terminated by `\n`. This layer only deals with line boundaries:
//! callers always get complete lines, never partial reads.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_line, encode_line, Line, LineConfig, DEFAULT_MAX_LINE, DELIMITER};
pub use error::{FrameError, Result};
pub use reader::LineReader;
pub use writer::LineWriter;
