//! JSON Schema contracts for agent event payloads.
//!
//! Validate the `data` of each received event against a JSON Schema
//! 2020-12 contract keyed by event name, so a misbehaving agent is caught
//! at the channel boundary rather than deep inside a verifier.
//!
//! Optional: the session layer only uses it with its `schema` feature.

pub mod config;
pub mod contracts;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
