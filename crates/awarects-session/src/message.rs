//! Message exchange between two discovery sessions.

use serde_json::json;
use tracing::info;

use crate::constants::{callback, event, key, method};
use crate::discovery::{describe, mismatch, required_bytes};
use crate::error::{AwareError, Result};
use crate::handle::{DiscoverySession, PeerHandle};
use crate::orchestrator::DeviceOrchestrator;

/// Send `payload` from `sender` to `peer` and confirm it arrived at `receiver`.
///
/// The sender must report `onMessageSendSucceeded` echoing `message_id`;
/// the receiver must then report `onMessageReceived` carrying exactly
/// `payload`. Returns the peer handle the receiver learned, which
/// addresses the sender in the reverse direction.
pub fn exchange(
    sender: &DeviceOrchestrator,
    sender_session: &DiscoverySession,
    receiver: &DeviceOrchestrator,
    receiver_session: &DiscoverySession,
    peer: &PeerHandle,
    payload: &str,
    message_id: i64,
) -> Result<PeerHandle> {
    sender.owns_session(sender_session)?;
    receiver.owns_session(receiver_session)?;
    if !peer.belongs_to(sender_session) {
        return Err(AwareError::ForeignPeer {
            peer_id: peer.peer_id(),
            peer_session: format!("{}/{}", peer.device(), peer.session_id()),
            session: format!("{}/{}", sender_session.device(), sender_session.id()),
        });
    }

    sender.call(
        method::SEND_MESSAGE,
        vec![
            json!(sender_session.id()),
            json!(peer.peer_id()),
            json!(message_id),
            json!(payload),
        ],
    )?;

    let result = sender.wait_event(sender_session.handle(), &[event::MESSAGE_SEND_RESULT])?;
    let outcome = result.get_str(key::CALLBACK_NAME).unwrap_or("<missing>");
    if outcome != callback::MESSAGE_SEND_SUCCEEDED {
        return Err(AwareError::UnexpectedCallback {
            device: sender.device_id().to_string(),
            expected: callback::MESSAGE_SEND_SUCCEEDED.to_string(),
            actual: outcome.to_string(),
        });
    }
    let echoed_id = result.get_i64(key::MESSAGE_ID);
    if echoed_id != Some(message_id) {
        return Err(AwareError::PayloadMismatch {
            device: sender.device_id().to_string(),
            field: key::MESSAGE_ID.to_string(),
            expected: message_id.to_string(),
            actual: describe(result.data.get(key::MESSAGE_ID)),
        });
    }

    let received = receiver.wait_event(receiver_session.handle(), &[event::MESSAGE_RECEIVED])?;
    let body = required_bytes(receiver.device_id(), &received, key::RECEIVED_MESSAGE)?;
    if body != payload.as_bytes() {
        return Err(mismatch(
            receiver.device_id(),
            key::RECEIVED_MESSAGE,
            payload.as_bytes(),
            &body,
        ));
    }

    let sender_peer_id = received
        .get_i64(key::PEER_ID)
        .ok_or_else(|| AwareError::PayloadMismatch {
            device: receiver.device_id().to_string(),
            field: key::PEER_ID.to_string(),
            expected: "integer peer id".to_string(),
            actual: describe(received.data.get(key::PEER_ID)),
        })?;

    info!(
        from = %sender.device_id(),
        to = %receiver.device_id(),
        message_id,
        "message delivered"
    );
    Ok(PeerHandle::new(sender_peer_id, receiver_session))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::model::{PublishConfig, SubscribeConfig};
    use crate::testing::{orchestrator, script_attach, script_sessions, ScriptedAgent};

    struct Pair {
        tx_agent: Arc<ScriptedAgent>,
        rx_agent: Arc<ScriptedAgent>,
        tx: DeviceOrchestrator,
        rx: DeviceOrchestrator,
        tx_session: DiscoverySession,
        rx_session: DiscoverySession,
    }

    fn pair() -> Pair {
        let (tx_agent, mut tx) = orchestrator("subscriber");
        let (rx_agent, mut rx) = orchestrator("publisher");
        for agent in [&tx_agent, &rx_agent] {
            script_attach(agent);
            script_sessions(agent);
        }
        tx.attach().unwrap();
        rx.attach().unwrap();
        let tx_session = tx.subscribe(SubscribeConfig::new("svc")).unwrap();
        let rx_session = rx.publish(PublishConfig::new("svc")).unwrap();
        Pair {
            tx_agent,
            rx_agent,
            tx,
            rx,
            tx_session,
            rx_session,
        }
    }

    fn send_result(name: &str, id: i64) -> Value {
        json!({"callbackName": name, "messageId": id})
    }

    #[test]
    fn delivered_message_returns_reverse_peer() {
        let p = pair();
        p.tx_agent
            .post(1, event::MESSAGE_SEND_RESULT, send_result("onMessageSendSucceeded", 1234));
        p.rx_agent.post(
            1,
            event::MESSAGE_RECEIVED,
            json!({"peerId": 77, "receivedMessage": [116, 101, 115, 116, 32, 109, 101, 115, 115, 97, 103, 101, 33]}),
        );

        let peer = PeerHandle::new(5, &p.tx_session);
        let reverse = exchange(
            &p.tx,
            &p.tx_session,
            &p.rx,
            &p.rx_session,
            &peer,
            "test message!",
            1234,
        )
        .unwrap();
        assert_eq!(reverse.peer_id(), 77);
        assert!(reverse.belongs_to(&p.rx_session));

        let params = p.tx_agent.params("wifiAwareSendMessage").unwrap();
        assert_eq!(params, vec![json!("1-2"), json!(5), json!(1234), json!("test message!")]);
    }

    #[test]
    fn send_failed_is_unexpected_callback() {
        let p = pair();
        p.tx_agent
            .post(1, event::MESSAGE_SEND_RESULT, send_result("onMessageSendFailed", 1234));
        let peer = PeerHandle::new(5, &p.tx_session);
        assert!(matches!(
            exchange(&p.tx, &p.tx_session, &p.rx, &p.rx_session, &peer, "hi", 1234),
            Err(AwareError::UnexpectedCallback { actual, .. }) if actual == "onMessageSendFailed"
        ));
    }

    #[test]
    fn message_id_must_echo() {
        let p = pair();
        p.tx_agent
            .post(1, event::MESSAGE_SEND_RESULT, send_result("onMessageSendSucceeded", 1));
        let peer = PeerHandle::new(5, &p.tx_session);
        assert!(matches!(
            exchange(&p.tx, &p.tx_session, &p.rx, &p.rx_session, &peer, "hi", 1234),
            Err(AwareError::PayloadMismatch { field, .. }) if field == "messageId"
        ));
    }

    #[test]
    fn payload_must_match() {
        let p = pair();
        p.tx_agent
            .post(1, event::MESSAGE_SEND_RESULT, send_result("onMessageSendSucceeded", 9));
        p.rx_agent.post(
            1,
            event::MESSAGE_RECEIVED,
            json!({"peerId": 1, "receivedMessage": "something else"}),
        );
        let peer = PeerHandle::new(5, &p.tx_session);
        assert!(matches!(
            exchange(&p.tx, &p.tx_session, &p.rx, &p.rx_session, &peer, "hi", 9),
            Err(AwareError::PayloadMismatch { field, .. }) if field == "receivedMessage"
        ));
    }

    #[test]
    fn missing_receipt_times_out() {
        let p = pair();
        p.tx_agent
            .post(1, event::MESSAGE_SEND_RESULT, send_result("onMessageSendSucceeded", 9));
        let peer = PeerHandle::new(5, &p.tx_session);
        let err = exchange(&p.tx, &p.tx_session, &p.rx, &p.rx_session, &peer, "hi", 9).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn peer_from_another_session_is_rejected() {
        let p = pair();
        let foreign = PeerHandle::new(5, &p.rx_session);
        assert!(matches!(
            exchange(&p.tx, &p.tx_session, &p.rx, &p.rx_session, &foreign, "hi", 9),
            Err(AwareError::ForeignPeer { .. })
        ));
        assert!(p.tx_agent.params("wifiAwareSendMessage").is_none());
    }
}
