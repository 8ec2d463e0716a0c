//! Wi-Fi Aware session orchestration across two devices.
//!
//! Drives a publisher and a subscriber through attach, discovery session
//! start, service discovery, message exchange and on-demand network setup,
//! checking at every stage that what the devices report matches what was
//! configured. Each device is reached through an
//! [`awarects_snippet::EventChannel`].
//!
//! Layers, bottom up:
//! - [`model`]: session configs and their agent-side JSON form
//! - [`orchestrator`]: per-device state machine owning that device's handles
//! - [`discovery`], [`message`], [`network`]: stage verifiers
//! - [`parallel`]: run one stage on both devices at once
//! - [`scenario`]: the test cases and the runner around them

pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod handle;
pub mod message;
pub mod model;
pub mod network;
pub mod orchestrator;
pub mod parallel;
pub mod scenario;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{parse_duration, RunConfig};
pub use discovery::{expected_discovery_event, verify_discovery, DiscoveredPeer};
pub use error::{AwareError, Result};
pub use handle::{AttachSession, DiscoverySession, NetworkRequestHandle, PeerHandle};
pub use message::exchange;
pub use model::{
    BootstrappingMethods, DiscoveryConfig, NetworkRequest, PairingConfig, PublishConfig,
    PublishType, SubscribeConfig, SubscribeType, Transport,
};
pub use network::{await_network, release_network, request_network, NetworkInfo};
pub use orchestrator::{DeviceOrchestrator, SessionState};
pub use parallel::{concurrent_exec, join_both};
pub use scenario::{
    CaseOutcome, CaseStatus, Diagnostics, LogDiagnostics, RunReport, Runner, TestCase,
};
