//! Names shared with the on-device agent.

/// Remote operations.
pub mod method {
    pub const IS_AVAILABLE: &str = "wifiAwareIsAvailable";
    pub const IS_PAIRING_SUPPORTED: &str = "wifiAwareIsAwarePairingSupported";
    pub const ATTACH: &str = "wifiAwareAttach";
    pub const DETACH: &str = "wifiAwareDetach";
    pub const IS_SESSION_ATTACHED: &str = "wifiAwareIsSessionAttached";
    pub const PUBLISH: &str = "wifiAwarePublish";
    pub const SUBSCRIBE: &str = "wifiAwareSubscribe";
    pub const CLOSE_DISCOVER_SESSION: &str = "wifiAwareCloseDiscoverSession";
    pub const CLOSE_ALL_SESSIONS: &str = "wifiAwareCloseAllWifiAwareSession";
    pub const SEND_MESSAGE: &str = "wifiAwareSendMessage";
    pub const CREATE_NETWORK_SPECIFIER: &str = "wifiAwareCreateNetworkSpecifier";
    pub const REQUEST_NETWORK: &str = "connectivityRequestNetwork";
    pub const UNREGISTER_NETWORK: &str = "connectivityUnregisterNetwork";

    /// Operations that answer through events and return a callback id.
    pub const ASYNC: [&str; 4] = [ATTACH, PUBLISH, SUBSCRIBE, REQUEST_NETWORK];
}

/// Event names posted by the agent.
pub mod event {
    pub const ATTACHED: &str = "onAttached";
    pub const ATTACH_FAILED: &str = "onAttachFailed";
    pub const AWARE_SESSION_TERMINATED: &str = "onAwareSessionTerminated";
    pub const DISCOVERY_RESULT: &str = "discoveryResult";
    pub const SERVICE_DISCOVERED: &str = "onServiceDiscovered";
    pub const SERVICE_DISCOVERED_WITHIN_RANGE: &str = "onServiceDiscoveredWithinRange";
    pub const MESSAGE_SEND_RESULT: &str = "messageSendResult";
    pub const MESSAGE_RECEIVED: &str = "onMessageReceived";
    pub const SESSION_TERMINATED: &str = "onSessionTerminated";
    pub const PAIRING_REQUEST_RECEIVED: &str = "onPairingSetupRequestReceived";
    pub const PAIRING_SUCCEEDED: &str = "onPairingSetupSucceeded";
    pub const PAIRING_FAILED: &str = "onPairingSetupFailed";
    pub const PAIRING_VERIFICATION_SUCCEEDED: &str = "onPairingVerificationSucceed";
    pub const PAIRING_VERIFICATION_FAILED: &str = "onPairingVerificationFailed";
    pub const BOOTSTRAPPING_SUCCEEDED: &str = "onBootstrappingSucceeded";
    pub const BOOTSTRAPPING_FAILED: &str = "onBootstrappingFailed";
    pub const NETWORK_CALLBACK: &str = "NetworkCallback";
}

/// Values of the `callbackName` field inside wrapper events.
pub mod callback {
    pub const PUBLISH_STARTED: &str = "onPublishStarted";
    pub const SUBSCRIBE_STARTED: &str = "onSubscribeStarted";
    pub const SESSION_CONFIG_UPDATED: &str = "onSessionConfigUpdated";
    pub const SESSION_CONFIG_FAILED: &str = "onSessionConfigFailed";
    pub const MESSAGE_SEND_SUCCEEDED: &str = "onMessageSendSucceeded";
    pub const MESSAGE_SEND_FAILED: &str = "onMessageSendFailed";
    pub const NETWORK_AVAILABLE: &str = "onAvailable";
    pub const NETWORK_UNAVAILABLE: &str = "onUnavailable";
    pub const CAPABILITIES_CHANGED: &str = "onCapabilitiesChanged";
    pub const NETWORK_LOST: &str = "onLost";
}

/// Keys inside event `data`.
pub mod key {
    pub const CALLBACK_NAME: &str = "callbackName";
    pub const IS_SESSION_INITIALIZED: &str = "isSessionInitialized";
    pub const PEER_ID: &str = "peerId";
    pub const SERVICE_SPECIFIC_INFO: &str = "serviceSpecificInfo";
    pub const MATCH_FILTER: &str = "matchFilter";
    pub const MATCH_FILTER_VALUE: &str = "value";
    pub const DISTANCE_MM: &str = "distanceMm";
    pub const PAIRED_ALIAS: &str = "pairedAlias";
    pub const MESSAGE_ID: &str = "messageId";
    pub const RECEIVED_MESSAGE: &str = "receivedMessage";
    pub const NETWORK: &str = "network";
    pub const NETWORK_CAPABILITIES: &str = "networkCapabilities";
    pub const TRANSPORT_INFO_CLASS_NAME: &str = "transportInfoClassName";
}

/// Transport info class reported for an Aware data path.
pub const AWARE_NETWORK_INFO_CLASS: &str = "android.net.wifi.aware.WifiAwareNetworkInfo";
