//! Session configs and their agent-side JSON form.
//!
//! Configs serialize to the mapping the agent deserializes: snake_case
//! keys, integer codes for kinds, byte fields as UTF-8 strings. Optional
//! fields are omitted when unset, never sent as `null`.

mod discovery;
mod network;
mod pairing;

pub use discovery::{DiscoveryConfig, PublishConfig, PublishType, SubscribeConfig, SubscribeType};
pub use network::{NetworkRequest, Transport};
pub use pairing::{BootstrappingMethods, PairingConfig};

use serde::ser::{Error as _, SerializeSeq};
use serde::Serializer;

/// Serialize bytes as the UTF-8 string the agent expects.
pub(crate) fn utf8<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| S::Error::custom(format!("bytes are not valid UTF-8: {err}")))?;
    serializer.serialize_str(text)
}

/// Serialize a match filter as a list of UTF-8 strings.
pub(crate) fn utf8_list<S: Serializer>(
    filter: &Option<Vec<Vec<u8>>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let Some(items) = filter else {
        return serializer.serialize_none();
    };
    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        let text = std::str::from_utf8(item).map_err(|err| {
            S::Error::custom(format!("match filter entry is not valid UTF-8: {err}"))
        })?;
        seq.serialize_element(text)?;
    }
    seq.end()
}

/// Render bytes for error messages: text when printable, hex otherwise.
pub(crate) fn display_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.chars().any(char::is_control) => format!("{text:?}"),
        _ => {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("0x{}", hex.join(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_bytes_prefers_text() {
        assert_eq!(display_bytes(b"abc"), "\"abc\"");
        assert_eq!(display_bytes(&[0xff, 0x01]), "0xff01");
        assert_eq!(display_bytes(b"a\nb"), "0x610a62");
    }
}
