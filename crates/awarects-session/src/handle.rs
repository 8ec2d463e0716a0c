//! Device-local handles.
//!
//! Every id here is only meaningful on the device that produced it. The
//! owning [`crate::DeviceOrchestrator`] keeps them; other code only sees
//! borrowed or cloned copies passed through explicitly.

use std::fmt;

use awarects_snippet::CallbackHandle;

use crate::model::DiscoveryConfig;

/// An attached Aware session, identified by the attach callback id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachSession {
    id: CallbackHandle,
}

impl AttachSession {
    pub(crate) fn new(id: CallbackHandle) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &str {
        self.id.id()
    }

    pub(crate) fn handle(&self) -> &CallbackHandle {
        &self.id
    }
}

/// A started publish or subscribe session.
///
/// Events for the session (discovery, messages) carry its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySession {
    device: String,
    handle: CallbackHandle,
    config: DiscoveryConfig,
}

impl DiscoverySession {
    pub(crate) fn new(device: &str, handle: CallbackHandle, config: DiscoveryConfig) -> Self {
        Self {
            device: device.to_string(),
            handle,
            config,
        }
    }

    /// Device that started the session. Callback ids repeat across devices.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    /// Same device and same callback id.
    pub fn is_same(&self, other: &DiscoverySession) -> bool {
        self.device == other.device && self.id() == other.id()
    }

    pub fn handle(&self) -> &CallbackHandle {
        &self.handle
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }
}

impl fmt::Display for DiscoverySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} session {}/{}", self.config.kind(), self.device, self.handle)
    }
}

/// A remote peer as seen from one discovery session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerHandle {
    peer_id: i64,
    device: String,
    session_id: String,
}

impl PeerHandle {
    pub(crate) fn new(peer_id: i64, session: &DiscoverySession) -> Self {
        Self {
            peer_id,
            device: session.device().to_string(),
            session_id: session.id().to_string(),
        }
    }

    pub fn peer_id(&self) -> i64 {
        self.peer_id
    }

    /// Device whose discovery session reported this peer.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Id of the discovery session this peer was learned on.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// True when this handle was learned on `session`.
    pub fn belongs_to(&self, session: &DiscoverySession) -> bool {
        self.device == session.device() && self.session_id == session.id()
    }
}

/// A pending or granted network request, identified by its callback id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequestHandle {
    device: String,
    handle: CallbackHandle,
}

impl NetworkRequestHandle {
    pub(crate) fn new(device: &str, handle: CallbackHandle) -> Self {
        Self {
            device: device.to_string(),
            handle,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn handle(&self) -> &CallbackHandle {
        &self.handle
    }
}
