use serde::{Serialize, Serializer};

/// Network transport, by its platform code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Cellular = 0,
    Wifi = 1,
    Bluetooth = 2,
    Ethernet = 3,
    Vpn = 4,
    WifiAware = 5,
}

impl Transport {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl Serialize for Transport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Request for an on-demand network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRequest {
    #[serde(rename = "transport_type")]
    pub transport: Transport,
    /// Opaque specifier produced by the device for one peer.
    pub network_specifier: String,
}

impl NetworkRequest {
    /// An Aware data-path request for a device-produced specifier.
    pub fn wifi_aware(network_specifier: impl Into<String>) -> Self {
        Self {
            transport: Transport::WifiAware,
            network_specifier: network_specifier.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_mapping() {
        let request = NetworkRequest::wifi_aware("c3BlYw==");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"transport_type": 5, "network_specifier": "c3BlYw=="})
        );
    }
}
