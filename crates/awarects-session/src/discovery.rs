//! Service discovery verification on the subscriber side.

use awarects_snippet::{bytes_from_value, SnippetEvent};
use serde_json::Value;
use tracing::info;

use crate::constants::{event, key};
use crate::error::{AwareError, Result};
use crate::handle::{DiscoverySession, PeerHandle};
use crate::model::{display_bytes, PublishConfig};
use crate::orchestrator::DeviceOrchestrator;

/// A publisher found by a subscribe session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    pub peer: PeerHandle,
    /// Reported for ranged discovery only.
    pub distance_mm: Option<i64>,
    pub paired_alias: Option<String>,
}

/// Event the subscriber should see for this publisher/subscriber pair.
///
/// Ranged discovery needs both sides: ranging on the publisher and a
/// maximum distance on the subscriber.
pub fn expected_discovery_event(publisher: &PublishConfig, subscriber: &DiscoverySession) -> &'static str {
    let max_distance = subscriber
        .config()
        .as_subscribe()
        .and_then(|config| config.max_distance_mm);
    if publisher.ranging_enabled && max_distance.is_some() {
        event::SERVICE_DISCOVERED_WITHIN_RANGE
    } else {
        event::SERVICE_DISCOVERED
    }
}

/// Wait for the publisher to be discovered and check it echoes the publisher's values.
///
/// Service-specific info and match filter must equal what the publisher was
/// configured with, byte for byte; an absent publisher filter must arrive
/// as an empty one.
pub fn verify_discovery(
    subscriber: &DeviceOrchestrator,
    session: &DiscoverySession,
    publisher: &PublishConfig,
) -> Result<DiscoveredPeer> {
    subscriber.owns_session(session)?;
    let expected = expected_discovery_event(publisher, session);
    let found = subscriber.wait_event(session.handle(), &[expected])?;
    let device = subscriber.device_id();

    let ssi = required_bytes(device, &found, key::SERVICE_SPECIFIC_INFO)?;
    if ssi != publisher.service_specific_info {
        return Err(mismatch(
            device,
            key::SERVICE_SPECIFIC_INFO,
            &publisher.service_specific_info,
            &ssi,
        ));
    }

    let filter = match_filter(device, &found)?;
    let expected_filter = publisher.filter_or_empty();
    if filter != expected_filter {
        return Err(AwareError::PayloadMismatch {
            device: device.to_string(),
            field: key::MATCH_FILTER.to_string(),
            expected: render_filter(expected_filter),
            actual: render_filter(&filter),
        });
    }

    let peer_id = found.get_i64(key::PEER_ID).ok_or_else(|| AwareError::PayloadMismatch {
        device: device.to_string(),
        field: key::PEER_ID.to_string(),
        expected: "integer peer id".to_string(),
        actual: describe(found.data.get(key::PEER_ID)),
    })?;

    let distance_mm = if expected == event::SERVICE_DISCOVERED_WITHIN_RANGE {
        found.get_i64(key::DISTANCE_MM)
    } else {
        None
    };
    info!(device, %session, peer_id, ?distance_mm, "publisher discovered");

    Ok(DiscoveredPeer {
        peer: PeerHandle::new(peer_id, session),
        distance_mm,
        paired_alias: found.get_str(key::PAIRED_ALIAS).map(str::to_string),
    })
}

pub(crate) fn required_bytes(device: &str, found: &SnippetEvent, field: &str) -> Result<Vec<u8>> {
    found.get_bytes(field).ok_or_else(|| AwareError::PayloadMismatch {
        device: device.to_string(),
        field: field.to_string(),
        expected: "byte array".to_string(),
        actual: describe(found.data.get(field)),
    })
}

fn match_filter(device: &str, found: &SnippetEvent) -> Result<Vec<Vec<u8>>> {
    let invalid = |actual: String| AwareError::PayloadMismatch {
        device: device.to_string(),
        field: key::MATCH_FILTER.to_string(),
        expected: "list of {value: bytes}".to_string(),
        actual,
    };
    match found.data.get(key::MATCH_FILTER) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry
                    .get(key::MATCH_FILTER_VALUE)
                    .and_then(bytes_from_value)
                    .ok_or_else(|| invalid(entry.to_string()))
            })
            .collect(),
        Some(other) => Err(invalid(other.to_string())),
    }
}

pub(crate) fn mismatch(device: &str, field: &str, expected: &[u8], actual: &[u8]) -> AwareError {
    AwareError::PayloadMismatch {
        device: device.to_string(),
        field: field.to_string(),
        expected: display_bytes(expected),
        actual: display_bytes(actual),
    }
}

fn render_filter(filter: &[Vec<u8>]) -> String {
    let items: Vec<String> = filter.iter().map(|entry| display_bytes(entry)).collect();
    format!("[{}]", items.join(", "))
}

pub(crate) fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "<missing>".to_string(), Value::to_string)
}
