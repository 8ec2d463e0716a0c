use serde::{Serialize, Serializer};

use super::pairing::PairingConfig;
use super::{utf8, utf8_list};
use crate::constants::{callback, method};

/// How a publisher advertises its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishType {
    #[default]
    Unsolicited = 0,
    Solicited = 1,
}

impl Serialize for PublishType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(*self as i32)
    }
}

/// How a subscriber looks for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscribeType {
    #[default]
    Passive = 0,
    Active = 1,
}

impl Serialize for SubscribeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(*self as i32)
    }
}

/// Configuration of a publish session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishConfig {
    pub service_name: String,
    #[serde(serialize_with = "utf8")]
    pub service_specific_info: Vec<u8>,
    #[serde(
        serialize_with = "utf8_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub match_filter: Option<Vec<Vec<u8>>>,
    pub publish_type: PublishType,
    pub terminate_notification_enabled: bool,
    pub ranging_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_config: Option<PairingConfig>,
}

impl PublishConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_specific_info: Vec::new(),
            match_filter: None,
            publish_type: PublishType::default(),
            terminate_notification_enabled: true,
            ranging_enabled: false,
            pairing_config: None,
        }
    }

    pub fn with_service_specific_info(mut self, ssi: impl Into<Vec<u8>>) -> Self {
        self.service_specific_info = ssi.into();
        self
    }

    pub fn with_match_filter(mut self, filter: Vec<Vec<u8>>) -> Self {
        self.match_filter = Some(filter);
        self
    }

    pub fn with_publish_type(mut self, publish_type: PublishType) -> Self {
        self.publish_type = publish_type;
        self
    }

    pub fn with_ranging(mut self, enabled: bool) -> Self {
        self.ranging_enabled = enabled;
        self
    }

    pub fn with_terminate_notification(mut self, enabled: bool) -> Self {
        self.terminate_notification_enabled = enabled;
        self
    }

    pub fn with_pairing(mut self, pairing: PairingConfig) -> Self {
        self.pairing_config = Some(pairing);
        self
    }

    /// Filter entries a subscriber should see echoed; absent means empty.
    pub fn filter_or_empty(&self) -> &[Vec<u8>] {
        self.match_filter.as_deref().unwrap_or(&[])
    }
}

/// Configuration of a subscribe session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeConfig {
    pub service_name: String,
    #[serde(serialize_with = "utf8")]
    pub service_specific_info: Vec<u8>,
    #[serde(
        serialize_with = "utf8_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub match_filter: Option<Vec<Vec<u8>>>,
    pub subscribe_type: SubscribeType,
    pub terminate_notification_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance_mm: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_config: Option<PairingConfig>,
}

impl SubscribeConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_specific_info: Vec::new(),
            match_filter: None,
            subscribe_type: SubscribeType::default(),
            terminate_notification_enabled: false,
            max_distance_mm: None,
            pairing_config: None,
        }
    }

    pub fn with_service_specific_info(mut self, ssi: impl Into<Vec<u8>>) -> Self {
        self.service_specific_info = ssi.into();
        self
    }

    pub fn with_match_filter(mut self, filter: Vec<Vec<u8>>) -> Self {
        self.match_filter = Some(filter);
        self
    }

    pub fn with_subscribe_type(mut self, subscribe_type: SubscribeType) -> Self {
        self.subscribe_type = subscribe_type;
        self
    }

    pub fn with_max_distance_mm(mut self, distance_mm: i64) -> Self {
        self.max_distance_mm = Some(distance_mm);
        self
    }

    pub fn with_terminate_notification(mut self, enabled: bool) -> Self {
        self.terminate_notification_enabled = enabled;
        self
    }

    pub fn with_pairing(mut self, pairing: PairingConfig) -> Self {
        self.pairing_config = Some(pairing);
        self
    }
}

/// Either kind of discovery session config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryConfig {
    Publish(PublishConfig),
    Subscribe(SubscribeConfig),
}

impl DiscoveryConfig {
    /// Agent operation that starts this session.
    pub fn method(&self) -> &'static str {
        match self {
            DiscoveryConfig::Publish(_) => method::PUBLISH,
            DiscoveryConfig::Subscribe(_) => method::SUBSCRIBE,
        }
    }

    /// `callbackName` that reports a successful start.
    pub fn started_callback(&self) -> &'static str {
        match self {
            DiscoveryConfig::Publish(_) => callback::PUBLISH_STARTED,
            DiscoveryConfig::Subscribe(_) => callback::SUBSCRIBE_STARTED,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryConfig::Publish(_) => "publish",
            DiscoveryConfig::Subscribe(_) => "subscribe",
        }
    }

    pub fn service_name(&self) -> &str {
        match self {
            DiscoveryConfig::Publish(config) => &config.service_name,
            DiscoveryConfig::Subscribe(config) => &config.service_name,
        }
    }

    /// The agent-side JSON mapping.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            DiscoveryConfig::Publish(config) => serde_json::to_value(config),
            DiscoveryConfig::Subscribe(config) => serde_json::to_value(config),
        }
    }

    pub fn as_publish(&self) -> Option<&PublishConfig> {
        match self {
            DiscoveryConfig::Publish(config) => Some(config),
            DiscoveryConfig::Subscribe(_) => None,
        }
    }

    pub fn as_subscribe(&self) -> Option<&SubscribeConfig> {
        match self {
            DiscoveryConfig::Subscribe(config) => Some(config),
            DiscoveryConfig::Publish(_) => None,
        }
    }
}

impl From<PublishConfig> for DiscoveryConfig {
    fn from(config: PublishConfig) -> Self {
        DiscoveryConfig::Publish(config)
    }
}

impl From<SubscribeConfig> for DiscoveryConfig {
    fn from(config: SubscribeConfig) -> Self {
        DiscoveryConfig::Subscribe(config)
    }
}
