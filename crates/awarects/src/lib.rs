//! Two-device Wi-Fi Aware conformance test engine.
//!
//! awarects drives a publisher and a subscriber device through attach,
//! service discovery, message exchange and data-path setup, and checks
//! that each stage reports what was configured.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream transport to device agents (TCP, Unix socket)
//! - [`frame`]: newline-delimited line framing
//! - [`snippet`]: event channel client and agent-side server
//! - [`session`]: orchestration, stage verifiers and test cases (behind `session` feature)
//! - [`schema`]: event payload contracts (behind `schema` feature)
//! - [`sim`]: simulated Aware medium (behind `sim` feature)

/// Re-export transport types.
pub mod transport {
    pub use awarects_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use awarects_frame::*;
}

/// Re-export event channel types.
pub mod snippet {
    pub use awarects_snippet::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use awarects_session::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use awarects_schema::*;
}

/// Re-export simulator types (requires `sim` feature).
#[cfg(feature = "sim")]
pub mod sim {
    pub use awarects_sim::*;
}
