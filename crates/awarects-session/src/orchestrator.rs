use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use awarects_snippet::{CallbackHandle, EventChannel, SnippetEvent};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::constants::{event, key, method};
use crate::error::{AwareError, Result};
use crate::handle::{AttachSession, DiscoverySession, NetworkRequestHandle};
use crate::model::{DiscoveryConfig, PublishConfig, SubscribeConfig};

#[cfg(feature = "schema")]
type SchemaHandle = Arc<awarects_schema::SchemaRegistry>;

/// Lifecycle of one device within a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Attaching,
    Attached,
    SessionStarting,
    SessionActive,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Attaching => "attaching",
            SessionState::Attached => "attached",
            SessionState::SessionStarting => "session-starting",
            SessionState::SessionActive => "session-active",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives one device through the Aware lifecycle and owns its handles.
///
/// Attach sessions, discovery sessions and network requests created here
/// stay registered until closed, so [`teardown`](Self::teardown) can
/// release whatever a failed case left behind.
pub struct DeviceOrchestrator {
    channel: Arc<dyn EventChannel>,
    state: SessionState,
    timeout: Duration,
    attach: Option<AttachSession>,
    sessions: Vec<DiscoverySession>,
    networks: Vec<NetworkRequestHandle>,
    #[cfg(feature = "schema")]
    schema: Option<SchemaHandle>,
}

impl DeviceOrchestrator {
    /// Create an orchestrator waiting at most `timeout` for each event.
    pub fn new(channel: Arc<dyn EventChannel>, timeout: Duration) -> Self {
        Self {
            channel,
            state: SessionState::Idle,
            timeout,
            attach: None,
            sessions: Vec::new(),
            networks: Vec::new(),
            #[cfg(feature = "schema")]
            schema: None,
        }
    }

    /// Validate every awaited event against its payload contract.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(mut self, registry: SchemaHandle) -> Self {
        self.schema = Some(registry);
        self
    }

    pub fn device_id(&self) -> &str {
        self.channel.device_id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn channel(&self) -> &Arc<dyn EventChannel> {
        &self.channel
    }

    pub fn attach_session(&self) -> Option<&AttachSession> {
        self.attach.as_ref()
    }

    /// Discovery sessions currently open on this device.
    pub fn sessions(&self) -> &[DiscoverySession] {
        &self.sessions
    }

    /// Network requests not yet released.
    pub fn network_requests(&self) -> &[NetworkRequestHandle] {
        &self.networks
    }

    /// Require Wi-Fi Aware to be available on the device.
    pub fn check_available(&self) -> Result<()> {
        let available = self.call(method::IS_AVAILABLE, vec![])?;
        if available.as_bool() != Some(true) {
            return Err(AwareError::SetupFailure {
                device: self.device_id().to_string(),
                reason: "Wi-Fi Aware is not available".to_string(),
            });
        }
        debug!(device = %self.device_id(), "Wi-Fi Aware available");
        Ok(())
    }

    pub fn is_pairing_supported(&self) -> Result<bool> {
        let supported = self.call(method::IS_PAIRING_SUPPORTED, vec![])?;
        Ok(supported.as_bool().unwrap_or(false))
    }

    /// Attach to the Aware service.
    ///
    /// Succeeds only after `onAttached` and a confirmed attached session.
    pub fn attach(&mut self) -> Result<AttachSession> {
        self.require(
            "attach",
            &[SessionState::Idle, SessionState::Closed],
        )?;
        self.set_state(SessionState::Attaching);

        let result = self.attach_inner();
        match result {
            Ok(session) => {
                self.attach = Some(session.clone());
                self.set_state(SessionState::Attached);
                Ok(session)
            }
            Err(err) => self.fail(err),
        }
    }

    fn attach_inner(&self) -> Result<AttachSession> {
        let handle = self.invoke(method::ATTACH, vec![])?;
        let outcome = self.wait_event(&handle, &[event::ATTACHED, event::ATTACH_FAILED])?;
        if outcome.name == event::ATTACH_FAILED {
            return Err(AwareError::SetupFailure {
                device: self.device_id().to_string(),
                reason: "attach failed".to_string(),
            });
        }

        let attached = self.call(method::IS_SESSION_ATTACHED, vec![])?;
        if attached.as_bool() != Some(true) {
            return Err(AwareError::SetupFailure {
                device: self.device_id().to_string(),
                reason: "attach succeeded, but the Aware session is still null".to_string(),
            });
        }
        Ok(AttachSession::new(handle))
    }

    pub fn publish(&mut self, config: PublishConfig) -> Result<DiscoverySession> {
        self.start_session(DiscoveryConfig::Publish(config))
    }

    pub fn subscribe(&mut self, config: SubscribeConfig) -> Result<DiscoverySession> {
        self.start_session(DiscoveryConfig::Subscribe(config))
    }

    /// Start a publish or subscribe session on the attached device.
    ///
    /// The session exists only once the agent reports it started and
    /// initialized; any other outcome is an `UnexpectedCallback`.
    pub fn start_session(&mut self, config: DiscoveryConfig) -> Result<DiscoverySession> {
        self.require(
            config.kind(),
            &[SessionState::Attached, SessionState::SessionActive],
        )?;
        let Some(attach) = self.attach.clone() else {
            return Err(self.invalid_state(config.kind()));
        };
        self.set_state(SessionState::SessionStarting);

        match self.start_session_inner(&attach, config) {
            Ok(session) => {
                info!(device = %self.device_id(), %session, "discovery session started");
                self.sessions.push(session.clone());
                self.set_state(SessionState::SessionActive);
                Ok(session)
            }
            Err(err) => self.fail(err),
        }
    }

    fn start_session_inner(
        &self,
        attach: &AttachSession,
        config: DiscoveryConfig,
    ) -> Result<DiscoverySession> {
        let params = vec![json!(attach.id()), config.to_value()?];
        let handle = self.invoke(config.method(), params)?;
        let result = self.wait_event(&handle, &[event::DISCOVERY_RESULT])?;

        let callback_name = result.get_str(key::CALLBACK_NAME).unwrap_or("<missing>");
        let initialized = result.get_bool(key::IS_SESSION_INITIALIZED).unwrap_or(false);
        if callback_name != config.started_callback() || !initialized {
            return Err(AwareError::UnexpectedCallback {
                device: self.device_id().to_string(),
                expected: format!("{} with an initialized session", config.started_callback()),
                actual: format!("{callback_name} (initialized: {initialized})"),
            });
        }
        Ok(DiscoverySession::new(self.device_id(), handle, config))
    }

    /// Close one discovery session.
    pub fn close_session(&mut self, session: &DiscoverySession) -> Result<()> {
        let Some(pos) = self.sessions.iter().position(|s| s.is_same(session)) else {
            return Err(self.invalid_state("close an unknown session"));
        };
        self.call(method::CLOSE_DISCOVER_SESSION, vec![json!(session.id())])?;
        let closed = self.sessions.remove(pos);
        self.channel.release(closed.handle());
        debug!(device = %self.device_id(), %session, "discovery session closed");
        if self.sessions.is_empty() && self.state == SessionState::SessionActive {
            self.set_state(SessionState::Attached);
        }
        Ok(())
    }

    /// Detach from the Aware service, dropping its discovery sessions.
    pub fn detach(&mut self) -> Result<()> {
        let Some(attach) = self.attach.take() else {
            return Err(self.invalid_state("detach"));
        };
        for session in std::mem::take(&mut self.sessions) {
            self.channel.release(session.handle());
        }
        let result = self.call(method::DETACH, vec![json!(attach.id())]);
        self.channel.release(attach.handle());
        self.set_state(SessionState::Closed);
        result.map(|_| ())
    }

    /// Release every handle this device still owns. Best effort.
    ///
    /// Never stops at the first failure; all failures are logged and
    /// returned. The device ends up `Closed` either way.
    pub fn teardown(&mut self) -> Vec<AwareError> {
        let mut errors = Vec::new();

        for request in std::mem::take(&mut self.networks) {
            if let Err(err) = self.call(method::UNREGISTER_NETWORK, vec![json!(request.id())]) {
                errors.push(err);
            }
            self.channel.release(request.handle());
        }
        for session in std::mem::take(&mut self.sessions) {
            if let Err(err) = self.call(method::CLOSE_DISCOVER_SESSION, vec![json!(session.id())])
            {
                errors.push(err);
            }
            self.channel.release(session.handle());
        }
        if let Some(attach) = self.attach.take() {
            if let Err(err) = self.call(method::DETACH, vec![json!(attach.id())]) {
                errors.push(err);
            }
            self.channel.release(attach.handle());
        }
        if !errors.is_empty() {
            if let Err(err) = self.call(method::CLOSE_ALL_SESSIONS, vec![]) {
                errors.push(err);
            }
        }

        for err in &errors {
            warn!(device = %self.device_id(), %err, "teardown step failed");
        }
        if self.state != SessionState::Idle {
            self.set_state(SessionState::Closed);
        }
        errors
    }

    /// Wait for one of `names` on `handle` within the device timeout.
    pub fn wait_event(&self, handle: &CallbackHandle, names: &[&str]) -> Result<SnippetEvent> {
        self.wait_event_for(handle, names, self.timeout)
    }

    /// Wait with an explicit budget.
    pub fn wait_event_for(
        &self,
        handle: &CallbackHandle,
        names: &[&str],
        timeout: Duration,
    ) -> Result<SnippetEvent> {
        let event = self
            .channel
            .wait_any(handle, names, timeout)
            .map_err(|err| AwareError::from_channel(self.device_id(), err))?;
        #[cfg(feature = "schema")]
        if let Some(registry) = &self.schema {
            registry.validate_event(&event)?;
        }
        Ok(event)
    }

    pub(crate) fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.channel
            .call(method, params)
            .map_err(|err| AwareError::from_channel(self.device_id(), err))
    }

    pub(crate) fn invoke(&self, method: &str, params: Vec<Value>) -> Result<CallbackHandle> {
        self.channel
            .invoke(method, params)
            .map_err(|err| AwareError::from_channel(self.device_id(), err))
    }

    pub(crate) fn track_network(&mut self, request: NetworkRequestHandle) {
        self.networks.push(request);
    }

    pub(crate) fn untrack_network(&mut self, request: &NetworkRequestHandle) -> bool {
        let Some(pos) = self
            .networks
            .iter()
            .position(|r| r.device() == request.device() && r.id() == request.id())
        else {
            return false;
        };
        let released = self.networks.remove(pos);
        self.channel.release(released.handle());
        true
    }

    /// Require the session to be one this device owns.
    pub(crate) fn owns_session(&self, session: &DiscoverySession) -> Result<()> {
        if self.sessions.iter().any(|s| s.is_same(session)) {
            Ok(())
        } else {
            Err(self.invalid_state(&format!("use {session} it does not own")))
        }
    }

    fn require(&self, operation: &str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &str) -> AwareError {
        AwareError::InvalidState {
            device: self.device_id().to_string(),
            operation: operation.to_string(),
            state: self.state.to_string(),
        }
    }

    fn fail<T>(&mut self, err: AwareError) -> Result<T> {
        warn!(device = %self.device_id(), state = %self.state, %err, "device failed");
        self.set_state(SessionState::Failed);
        Err(err)
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            info!(device = %self.device_id(), from = %self.state, to = %next, "state change");
            self.state = next;
        }
    }
}

impl fmt::Debug for DeviceOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceOrchestrator")
            .field("device", &self.device_id())
            .field("state", &self.state)
            .field("attach", &self.attach)
            .field("sessions", &self.sessions.len())
            .field("networks", &self.networks.len())
            .finish()
    }
}
