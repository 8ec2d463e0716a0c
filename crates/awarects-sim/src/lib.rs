//! Simulated Wi-Fi Aware medium.
//!
//! A [`SimAir`] is the shared radio environment; every [`SimDevice`] on it
//! answers the agent RPC surface the way a device would: attach, publish
//! and subscribe with service matching, optional ranging, messages between
//! discovered peers, and network requests that come up once both peers ask
//! for each other. [`SimFaults`] make a device misbehave in specific ways.
//!
//! Devices are reachable in process through a
//! [`LocalChannel`](awarects_snippet::LocalChannel) or over TCP through a
//! [`SnippetServer`](awarects_snippet::SnippetServer).

mod air;
mod device;
mod faults;
mod wire;

pub use air::{SimAir, SIMULATED_DISTANCE_MM};
pub use device::SimDevice;
pub use faults::{SimFaults, UnknownFault};
