//! On-demand network establishment over an Aware data path.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::constants::{callback, event, key, method, AWARE_NETWORK_INFO_CLASS};
use crate::error::{AwareError, Result};
use crate::handle::{DiscoverySession, NetworkRequestHandle, PeerHandle};
use crate::model::NetworkRequest;
use crate::orchestrator::DeviceOrchestrator;

/// What the device reported once the network came up.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInfo {
    pub network: Value,
    pub capabilities: Value,
    pub transport_info_class: String,
}

/// Ask `device` for a network to `peer`, learned on `session`.
///
/// The request is tracked by the device until released, so teardown
/// unregisters it even when the case fails before
/// [`release_network`].
pub fn request_network(
    device: &mut DeviceOrchestrator,
    session: &DiscoverySession,
    peer: &PeerHandle,
    timeout: Duration,
) -> Result<NetworkRequestHandle> {
    device.owns_session(session)?;
    if !peer.belongs_to(session) {
        return Err(AwareError::ForeignPeer {
            peer_id: peer.peer_id(),
            peer_session: format!("{}/{}", peer.device(), peer.session_id()),
            session: format!("{}/{}", session.device(), session.id()),
        });
    }

    let specifier = device.call(
        method::CREATE_NETWORK_SPECIFIER,
        vec![json!(session.id()), json!(peer.peer_id())],
    )?;
    let Some(specifier) = specifier.as_str().filter(|s| !s.is_empty()) else {
        return Err(AwareError::PayloadMismatch {
            device: device.device_id().to_string(),
            field: "networkSpecifier".to_string(),
            expected: "non-empty specifier string".to_string(),
            actual: specifier.to_string(),
        });
    };

    let request = serde_json::to_value(NetworkRequest::wifi_aware(specifier))?;
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let handle = device.invoke(method::REQUEST_NETWORK, vec![request, json!(timeout_ms)])?;
    let handle = NetworkRequestHandle::new(device.device_id(), handle);
    debug!(device = %device.device_id(), request = %handle.id(), "network requested");
    device.track_network(handle.clone());
    Ok(handle)
}

/// Wait until the requested network reports Aware capabilities.
///
/// `onUnavailable` always fails. `onCapabilitiesChanged` must carry the
/// network, its capabilities and the Aware transport info class.
pub fn await_network(device: &DeviceOrchestrator, request: &NetworkRequestHandle) -> Result<NetworkInfo> {
    let update = device.wait_event(request.handle(), &[event::NETWORK_CALLBACK])?;
    let name = update.get_str(key::CALLBACK_NAME).unwrap_or("<missing>");
    let device_id = device.device_id();

    match name {
        callback::CAPABILITIES_CHANGED => {}
        callback::NETWORK_UNAVAILABLE => {
            return Err(AwareError::SetupFailure {
                device: device_id.to_string(),
                reason: "network request reported onUnavailable".to_string(),
            });
        }
        other => {
            return Err(AwareError::UnexpectedCallback {
                device: device_id.to_string(),
                expected: callback::CAPABILITIES_CHANGED.to_string(),
                actual: other.to_string(),
            });
        }
    }

    for field in [key::NETWORK, key::NETWORK_CAPABILITIES] {
        if !update.has(field) {
            return Err(AwareError::PayloadMismatch {
                device: device_id.to_string(),
                field: field.to_string(),
                expected: "present".to_string(),
                actual: "<missing>".to_string(),
            });
        }
    }

    let class = update.get_str(key::TRANSPORT_INFO_CLASS_NAME).unwrap_or("<missing>");
    if class != AWARE_NETWORK_INFO_CLASS {
        return Err(AwareError::PayloadMismatch {
            device: device_id.to_string(),
            field: key::TRANSPORT_INFO_CLASS_NAME.to_string(),
            expected: AWARE_NETWORK_INFO_CLASS.to_string(),
            actual: class.to_string(),
        });
    }

    info!(device = %device_id, request = %request.id(), "Aware network available");
    Ok(NetworkInfo {
        network: update.data.get(key::NETWORK).cloned().unwrap_or(Value::Null),
        capabilities: update
            .data
            .get(key::NETWORK_CAPABILITIES)
            .cloned()
            .unwrap_or(Value::Null),
        transport_info_class: class.to_string(),
    })
}

/// Unregister a network request.
pub fn release_network(device: &mut DeviceOrchestrator, request: &NetworkRequestHandle) -> Result<()> {
    if !device.untrack_network(request) {
        return Err(AwareError::InvalidState {
            device: device.device_id().to_string(),
            operation: format!("release unknown network request {}", request.id()),
            state: device.state().to_string(),
        });
    }
    device.call(method::UNREGISTER_NETWORK, vec![json!(request.id())])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{PublishConfig, SubscribeConfig};
    use crate::testing::{orchestrator, script_attach, script_sessions, ScriptedAgent};

    fn active() -> (Arc<ScriptedAgent>, DeviceOrchestrator, DiscoverySession) {
        let (agent, mut device) = orchestrator("publisher");
        script_attach(&agent);
        script_sessions(&agent);
        agent.on_call(method::CREATE_NETWORK_SPECIFIER, json!("YXdhcmU="));
        device.attach().unwrap();
        let session = device.publish(PublishConfig::new("svc")).unwrap();
        (agent, device, session)
    }

    fn capabilities(class: &str) -> Value {
        json!({
            "callbackName": "onCapabilitiesChanged",
            "network": {"netId": 100},
            "networkCapabilities": {"transports": [5]},
            "transportInfoClassName": class
        })
    }

    #[test]
    fn request_sends_aware_transport_and_timeout() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);

        let handle = request_network(&mut device, &session, &peer, Duration::from_secs(30)).unwrap();
        assert_eq!(device.network_requests(), &[handle.clone()]);

        let params = agent.params(method::CREATE_NETWORK_SPECIFIER).unwrap();
        assert_eq!(params, vec![json!(session.id()), json!(3)]);
        let params = agent.params(method::REQUEST_NETWORK).unwrap();
        assert_eq!(
            params,
            vec![
                json!({"transport_type": 5, "network_specifier": "YXdhcmU="}),
                json!(30_000)
            ]
        );

        release_network(&mut device, &handle).unwrap();
        assert!(device.network_requests().is_empty());
        assert!(release_network(&mut device, &handle).is_err());
    }

    #[test]
    fn capabilities_with_aware_info_succeed() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);
        let handle = request_network(&mut device, &session, &peer, Duration::from_secs(1)).unwrap();
        agent.post(2, event::NETWORK_CALLBACK, capabilities(AWARE_NETWORK_INFO_CLASS));

        let info = await_network(&device, &handle).unwrap();
        assert_eq!(info.network, json!({"netId": 100}));
        assert_eq!(info.transport_info_class, AWARE_NETWORK_INFO_CLASS);
    }

    #[test]
    fn unavailable_always_fails() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);
        let handle = request_network(&mut device, &session, &peer, Duration::from_secs(1)).unwrap();
        agent.post(2, event::NETWORK_CALLBACK, json!({"callbackName": "onUnavailable"}));

        assert!(matches!(
            await_network(&device, &handle),
            Err(AwareError::SetupFailure { .. })
        ));
    }

    #[test]
    fn wrong_transport_class_is_a_mismatch() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);
        let handle = request_network(&mut device, &session, &peer, Duration::from_secs(1)).unwrap();
        agent.post(2, event::NETWORK_CALLBACK, capabilities("android.net.wifi.WifiInfo"));

        assert!(matches!(
            await_network(&device, &handle),
            Err(AwareError::PayloadMismatch { field, .. }) if field == "transportInfoClassName"
        ));
    }

    #[test]
    fn missing_capabilities_is_a_mismatch() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);
        let handle = request_network(&mut device, &session, &peer, Duration::from_secs(1)).unwrap();
        agent.post(
            2,
            event::NETWORK_CALLBACK,
            json!({
                "callbackName": "onCapabilitiesChanged",
                "network": {"netId": 1},
                "networkCapabilities": null,
                "transportInfoClassName": AWARE_NETWORK_INFO_CLASS
            }),
        );
        assert!(matches!(
            await_network(&device, &handle),
            Err(AwareError::PayloadMismatch { field, .. }) if field == "networkCapabilities"
        ));
    }

    #[test]
    fn other_callbacks_are_unexpected() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);
        let handle = request_network(&mut device, &session, &peer, Duration::from_secs(1)).unwrap();
        agent.post(2, event::NETWORK_CALLBACK, json!({"callbackName": "onLost"}));
        assert!(matches!(
            await_network(&device, &handle),
            Err(AwareError::UnexpectedCallback { .. })
        ));
    }

    #[test]
    fn teardown_unregisters_outstanding_requests() {
        let (agent, mut device, session) = active();
        let peer = PeerHandle::new(3, &session);
        request_network(&mut device, &session, &peer, Duration::from_secs(1)).unwrap();

        assert!(device.teardown().is_empty());
        assert!(agent.params(method::UNREGISTER_NETWORK).is_some());
    }

    #[test]
    fn session_of_other_device_with_same_id_is_rejected() {
        let (pub_agent, mut publisher, pub_session) = active();
        let (sub_agent, mut subscriber) = orchestrator("subscriber");
        script_attach(&sub_agent);
        script_sessions(&sub_agent);
        subscriber.attach().unwrap();
        let sub_session = subscriber.subscribe(SubscribeConfig::new("svc")).unwrap();
        assert_eq!(sub_session.id(), pub_session.id());

        let peer = PeerHandle::new(9, &sub_session);
        assert!(!peer.belongs_to(&pub_session));
        assert!(matches!(
            request_network(&mut publisher, &sub_session, &peer, Duration::from_secs(1)),
            Err(AwareError::InvalidState { .. })
        ));
        assert!(matches!(
            request_network(&mut publisher, &pub_session, &peer, Duration::from_secs(1)),
            Err(AwareError::ForeignPeer { .. })
        ));
        assert!(pub_agent.params(method::CREATE_NETWORK_SPECIFIER).is_none());
        assert!(publisher.network_requests().is_empty());
    }
}
