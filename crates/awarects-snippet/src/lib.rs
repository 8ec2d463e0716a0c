//! Event channel client for on-device snippet agents.
//!
//! This is the "invoke and wait" layer. Issue named remote operations
//! against one device, get a callback handle back for asynchronous ones,
//! and block on that handle for a named event within a timeout.
//!
//! Each connected device gets its own listener thread feeding a
//! per-callback [`EventMailbox`], so a wait on one device never holds up
//! another device's events.

pub mod channel;
pub mod client;
pub mod connector;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod local;
pub mod mailbox;
pub mod protocol;
pub mod server;

pub use channel::{CallbackHandle, EventChannel};
pub use client::{ClientConfig, SnippetClient};
pub use connector::{connect, connect_with_config};
pub use error::{ChannelError, Result};
pub use handler::{EventSink, RpcCall, RpcHandler};
pub use handshake::{
    handshake_client, handshake_server, HandshakeConfig, HandshakeRequest, HandshakeResponse,
    HandshakeResult, CMD_CONTINUE, CMD_INITIATE,
};
pub use local::LocalChannel;
pub use mailbox::{EventMailbox, DEFAULT_MAILBOX_CAPACITY};
pub use protocol::{bytes_from_value, AgentMessage, RpcRequest, RpcResponse, SnippetEvent};
pub use server::SnippetServer;
