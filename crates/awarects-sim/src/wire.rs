//! Names and encodings of the agent surface the simulator answers.

use serde_json::Value;

pub(crate) const IS_AVAILABLE: &str = "wifiAwareIsAvailable";
pub(crate) const IS_PAIRING_SUPPORTED: &str = "wifiAwareIsAwarePairingSupported";
pub(crate) const ATTACH: &str = "wifiAwareAttach";
pub(crate) const DETACH: &str = "wifiAwareDetach";
pub(crate) const IS_SESSION_ATTACHED: &str = "wifiAwareIsSessionAttached";
pub(crate) const PUBLISH: &str = "wifiAwarePublish";
pub(crate) const SUBSCRIBE: &str = "wifiAwareSubscribe";
pub(crate) const CLOSE_DISCOVER_SESSION: &str = "wifiAwareCloseDiscoverSession";
pub(crate) const CLOSE_ALL: &str = "wifiAwareCloseAllWifiAwareSession";
pub(crate) const SEND_MESSAGE: &str = "wifiAwareSendMessage";
pub(crate) const CREATE_NETWORK_SPECIFIER: &str = "wifiAwareCreateNetworkSpecifier";
pub(crate) const REQUEST_NETWORK: &str = "connectivityRequestNetwork";
pub(crate) const UNREGISTER_NETWORK: &str = "connectivityUnregisterNetwork";

pub(crate) const ON_ATTACHED: &str = "onAttached";
pub(crate) const ON_ATTACH_FAILED: &str = "onAttachFailed";
pub(crate) const DISCOVERY_RESULT: &str = "discoveryResult";
pub(crate) const ON_SERVICE_DISCOVERED: &str = "onServiceDiscovered";
pub(crate) const ON_SERVICE_DISCOVERED_WITHIN_RANGE: &str = "onServiceDiscoveredWithinRange";
pub(crate) const MESSAGE_SEND_RESULT: &str = "messageSendResult";
pub(crate) const ON_MESSAGE_RECEIVED: &str = "onMessageReceived";
pub(crate) const NETWORK_CALLBACK: &str = "NetworkCallback";

pub(crate) const PUBLISH_STARTED: &str = "onPublishStarted";
pub(crate) const SUBSCRIBE_STARTED: &str = "onSubscribeStarted";
pub(crate) const SESSION_CONFIG_FAILED: &str = "onSessionConfigFailed";
pub(crate) const MESSAGE_SEND_SUCCEEDED: &str = "onMessageSendSucceeded";
pub(crate) const MESSAGE_SEND_FAILED: &str = "onMessageSendFailed";
pub(crate) const CAPABILITIES_CHANGED: &str = "onCapabilitiesChanged";
pub(crate) const UNAVAILABLE: &str = "onUnavailable";

pub(crate) const AWARE_NETWORK_INFO_CLASS: &str = "android.net.wifi.aware.WifiAwareNetworkInfo";
pub(crate) const WIFI_INFO_CLASS: &str = "android.net.wifi.WifiInfo";
pub(crate) const TRANSPORT_WIFI_AWARE: i64 = 5;

/// Encode bytes the way a Java agent serializes `byte[]`: signed integers.
pub(crate) fn java_bytes(bytes: &[u8]) -> Value {
    Value::Array(
        bytes
            .iter()
            .map(|b| Value::from(i64::from(*b as i8)))
            .collect(),
    )
}

/// Millisecond wall-clock timestamp for events.
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
