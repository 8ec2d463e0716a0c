use std::sync::Arc;
use std::time::Duration;

use awarects_sim::{SimAir, SimFaults, SIMULATED_DISTANCE_MM};
use awarects_snippet::{bytes_from_value, connect, CallbackHandle, EventChannel, SnippetEvent};
use awarects_transport::DeviceAddr;
use serde_json::{json, Value};

const WAIT: Duration = Duration::from_secs(2);
const SHORT: Duration = Duration::from_millis(50);

struct Peer {
    channel: Arc<dyn EventChannel>,
    attach: CallbackHandle,
}

impl Peer {
    fn attach(channel: Arc<dyn EventChannel>) -> Self {
        let attach = channel.invoke("wifiAwareAttach", vec![]).unwrap();
        channel.wait(&attach, "onAttached", WAIT).unwrap();
        Self { channel, attach }
    }

    fn start(&self, method: &str, config: Value) -> CallbackHandle {
        let session = self
            .channel
            .invoke(method, vec![json!(self.attach.id()), config])
            .unwrap();
        let started = self.channel.wait(&session, "discoveryResult", WAIT).unwrap();
        assert_eq!(started.get_bool("isSessionInitialized"), Some(true));
        session
    }

    fn wait(&self, handle: &CallbackHandle, name: &str) -> SnippetEvent {
        self.channel.wait(handle, name, WAIT).unwrap()
    }
}

fn publish_config(ranging: bool) -> Value {
    json!({
        "service_name": "CtsVerifierTestService",
        "service_specific_info": "Extra bytes in the publisher discovery",
        "match_filter": ["bytes used for matching"],
        "publish_type": 0,
        "ranging_enabled": ranging,
    })
}

fn subscribe_config(max_distance_mm: Option<i64>) -> Value {
    let mut config = json!({
        "service_name": "CtsVerifierTestService",
        "service_specific_info": "Arbitrary bytes for the subscribe discovery",
        "match_filter": ["bytes used for matching"],
        "subscribe_type": 0,
    });
    if let Some(max) = max_distance_mm {
        config["max_distance_mm"] = json!(max);
    }
    config
}

fn pair(air: &SimAir, sub_faults: SimFaults) -> (Peer, Peer) {
    let publisher = Peer::attach(air.local_channel("pub", SimFaults::none()));
    let subscriber = Peer::attach(air.local_channel("sub", sub_faults));
    (publisher, subscriber)
}

#[test]
fn subscriber_discovers_publisher_values() {
    let air = SimAir::new();
    let (publisher, subscriber) = pair(&air, SimFaults::none());
    let _pub_session = publisher.start("wifiAwarePublish", publish_config(false));
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(None));

    let found = subscriber.wait(&sub_session, "onServiceDiscovered");
    assert_eq!(
        found.get_bytes("serviceSpecificInfo").unwrap(),
        b"Extra bytes in the publisher discovery"
    );
    let filter = &found.data["matchFilter"][0]["value"];
    assert_eq!(bytes_from_value(filter).unwrap(), b"bytes used for matching");
    assert!(found.get_i64("peerId").is_some());
    assert_eq!(air.open_sessions("pub"), 1);
}

#[test]
fn subscribe_before_publish_still_matches() {
    let air = SimAir::new();
    let (publisher, subscriber) = pair(&air, SimFaults::none());
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(None));
    assert!(subscriber
        .channel
        .wait(&sub_session, "onServiceDiscovered", SHORT)
        .is_err());

    publisher.start("wifiAwarePublish", publish_config(false));
    subscriber.wait(&sub_session, "onServiceDiscovered");
}

#[test]
fn ranged_discovery_reports_distance() {
    let air = SimAir::new();
    let (publisher, subscriber) = pair(&air, SimFaults::none());
    publisher.start("wifiAwarePublish", publish_config(true));
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(Some(100_000)));

    let found = subscriber.wait(&sub_session, "onServiceDiscoveredWithinRange");
    assert_eq!(found.get_i64("distanceMm"), Some(SIMULATED_DISTANCE_MM));
}

#[test]
fn out_of_range_publisher_is_not_reported() {
    let air = SimAir::new();
    let (publisher, subscriber) = pair(&air, SimFaults::none());
    publisher.start("wifiAwarePublish", publish_config(true));
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(Some(10)));

    let err = subscriber
        .channel
        .wait_any(
            &sub_session,
            &["onServiceDiscovered", "onServiceDiscoveredWithinRange"],
            SHORT,
        )
        .unwrap_err();
    assert!(err.is_timeout());
}

#[test]
fn messages_and_network_between_peers() {
    let air = SimAir::new();
    let (publisher, subscriber) = pair(&air, SimFaults::none());
    let pub_session = publisher.start("wifiAwarePublish", publish_config(false));
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(None));
    let found = subscriber.wait(&sub_session, "onServiceDiscovered");
    let publisher_peer = found.get_i64("peerId").unwrap();

    subscriber
        .channel
        .call(
            "wifiAwareSendMessage",
            vec![json!(sub_session.id()), json!(publisher_peer), json!(1234), json!("test message!")],
        )
        .unwrap();
    let sent = subscriber.wait(&sub_session, "messageSendResult");
    assert_eq!(sent.get_str("callbackName"), Some("onMessageSendSucceeded"));
    assert_eq!(sent.get_i64("messageId"), Some(1234));

    let received = publisher.wait(&pub_session, "onMessageReceived");
    assert_eq!(received.get_bytes("receivedMessage").unwrap(), b"test message!");
    let subscriber_peer = received.get_i64("peerId").unwrap();

    let mut requests = Vec::new();
    for (peer, session, peer_id) in [
        (&publisher, &pub_session, subscriber_peer),
        (&subscriber, &sub_session, publisher_peer),
    ] {
        let specifier = peer
            .channel
            .call(
                "wifiAwareCreateNetworkSpecifier",
                vec![json!(session.id()), json!(peer_id)],
            )
            .unwrap();
        let request = json!({"transport_type": 5, "network_specifier": specifier});
        let handle = peer
            .channel
            .invoke("connectivityRequestNetwork", vec![request, json!(30_000)])
            .unwrap();
        requests.push((peer, handle));
    }
    for (peer, handle) in &requests {
        let update = peer.wait(handle, "NetworkCallback");
        assert_eq!(update.get_str("callbackName"), Some("onCapabilitiesChanged"));
        assert_eq!(
            update.get_str("transportInfoClassName"),
            Some("android.net.wifi.aware.WifiAwareNetworkInfo")
        );
        assert!(update.has("networkCapabilities"));
    }
    assert_eq!(air.active_networks(), 2);

    for (peer, handle) in &requests {
        peer.channel
            .call("connectivityUnregisterNetwork", vec![json!(handle.id())])
            .unwrap();
    }
    assert_eq!(air.active_networks(), 0);
}

#[test]
fn dropped_message_reports_success_but_never_arrives() {
    let air = SimAir::new();
    let faults = SimFaults {
        drop_messages: true,
        ..SimFaults::none()
    };
    let (publisher, subscriber) = pair(&air, faults);
    let pub_session = publisher.start("wifiAwarePublish", publish_config(false));
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(None));
    let peer = subscriber
        .wait(&sub_session, "onServiceDiscovered")
        .get_i64("peerId")
        .unwrap();

    subscriber
        .channel
        .call(
            "wifiAwareSendMessage",
            vec![json!(sub_session.id()), json!(peer), json!(1), json!("lost")],
        )
        .unwrap();
    let sent = subscriber.wait(&sub_session, "messageSendResult");
    assert_eq!(sent.get_str("callbackName"), Some("onMessageSendSucceeded"));
    assert!(publisher
        .channel
        .wait(&pub_session, "onMessageReceived", SHORT)
        .is_err());
}

#[test]
fn unknown_peer_is_a_remote_error() {
    let air = SimAir::new();
    let (_publisher, subscriber) = pair(&air, SimFaults::none());
    let sub_session = subscriber.start("wifiAwareSubscribe", subscribe_config(None));
    let err = subscriber
        .channel
        .call(
            "wifiAwareSendMessage",
            vec![json!(sub_session.id()), json!(999), json!(1), json!("x")],
        )
        .unwrap_err();
    assert!(err.to_string().contains("unknown peer 999"));
}

#[test]
fn detach_releases_sessions() {
    let air = SimAir::new();
    let (publisher, _subscriber) = pair(&air, SimFaults::none());
    publisher.start("wifiAwarePublish", publish_config(false));
    assert_eq!(air.open_sessions("pub"), 1);

    publisher
        .channel
        .call("wifiAwareDetach", vec![json!(publisher.attach.id())])
        .unwrap();
    assert_eq!(air.open_sessions("pub"), 0);
    assert_eq!(
        publisher.channel.call("wifiAwareIsSessionAttached", vec![]).unwrap(),
        json!(false)
    );
}

#[test]
fn simulated_device_over_tcp() {
    let air = SimAir::new();
    let server = air.serve("remote", SimFaults::none(), "127.0.0.1:0").unwrap();
    let addr = DeviceAddr::Tcp(server.local_addr().to_string());
    let serving = server.spawn_one().unwrap();

    let client = connect(&addr, "remote").unwrap();
    assert_eq!(client.call("wifiAwareIsAvailable", vec![]).unwrap(), json!(true));
    let attach = client.invoke("wifiAwareAttach", vec![]).unwrap();
    client.wait(&attach, "onAttached", WAIT).unwrap();

    drop(client);
    serving.join().unwrap().unwrap();
}
