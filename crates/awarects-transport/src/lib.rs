//! Byte-stream transport to on-device test agents.
//!
//! Device agents are normally reached over a forwarded TCP port; Unix
//! domain sockets are supported for local agents and tests.
//!
//! This is the lowest layer of awarects. Everything else builds on top of
//! the [`DeviceStream`] type provided here.

pub mod addr;
pub mod error;
pub mod stream;
pub mod tcp;

pub use addr::DeviceAddr;
pub use error::{Result, TransportError};
pub use stream::DeviceStream;
pub use tcp::TcpEndpoint;
