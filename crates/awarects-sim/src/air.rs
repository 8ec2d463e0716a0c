use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use awarects_snippet::{EventSink, LocalChannel, SnippetEvent, SnippetServer};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::device::SimDevice;
use crate::faults::SimFaults;
use crate::wire::{self, java_bytes, now_ms};

/// Distance every ranged discovery reports.
pub const SIMULATED_DISTANCE_MM: i64 = 1500;

/// The radio environment shared by simulated devices.
///
/// Cloning yields another handle to the same medium.
#[derive(Clone, Default)]
pub struct SimAir {
    medium: Arc<Mutex<Medium>>,
}

#[derive(Default)]
struct Medium {
    devices: Vec<String>,
    sessions: Vec<SessionEntry>,
    specifiers: HashMap<String, Link>,
    networks: Vec<NetworkEntry>,
    next_peer_id: i64,
    next_specifier: u64,
    next_network: i64,
}

/// A discovery session, addressed by owning device and callback id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionKey {
    pub(crate) device: String,
    pub(crate) id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Publish { ranging: bool },
    Subscribe { max_distance_mm: Option<i64> },
}

/// What a device asked for when it started a discovery session.
#[derive(Debug, Clone)]
pub(crate) struct SessionSpec {
    pub(crate) service_name: String,
    pub(crate) ssi: Vec<u8>,
    pub(crate) filter: Vec<Vec<u8>>,
    pub(crate) role: Role,
}

struct SessionEntry {
    key: SessionKey,
    spec: SessionSpec,
    sink: Arc<dyn EventSink>,
    faults: SimFaults,
    /// Peer ids this session handed out, and whom they name.
    peers: Vec<(i64, SessionKey)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    local: SessionKey,
    remote: SessionKey,
}

struct NetworkEntry {
    device: String,
    request_id: String,
    link: Link,
    sink: Arc<dyn EventSink>,
    faults: SimFaults,
    established: bool,
}

/// Events produced under the medium lock, posted after it is released.
#[derive(Default)]
#[must_use]
pub(crate) struct Outbox(Vec<(Arc<dyn EventSink>, SnippetEvent)>);

impl Outbox {
    fn push(&mut self, sink: &Arc<dyn EventSink>, callback_id: &str, name: &str, data: Value) {
        let mut event = SnippetEvent::new(callback_id, name);
        event.time = now_ms();
        if let Value::Object(map) = data {
            event.data = map;
        }
        self.0.push((Arc::clone(sink), event));
    }

    pub(crate) fn deliver(self) {
        for (sink, event) in self.0 {
            sink.post(event);
        }
    }
}

impl SimAir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a device called `name` on the air.
    pub fn device(&self, name: &str, faults: SimFaults) -> SimDevice {
        let mut medium = self.lock();
        if !medium.devices.iter().any(|d| d == name) {
            medium.devices.push(name.to_string());
        }
        drop(medium);
        SimDevice::new(name, self.clone(), faults)
    }

    /// A device reachable through an in-process channel.
    pub fn local_channel(&self, name: &str, faults: SimFaults) -> Arc<LocalChannel<SimDevice>> {
        let device = self.device(name, faults);
        let uid = self.device_index(name);
        Arc::new(LocalChannel::with_uid(name, device, uid))
    }

    /// A device served over TCP on `addr`.
    pub fn serve(
        &self,
        name: &str,
        faults: SimFaults,
        addr: &str,
    ) -> awarects_snippet::Result<SnippetServer> {
        let device = Arc::new(self.device(name, faults));
        let server = SnippetServer::bind(addr, device)?;
        info!(device = name, addr = %server.local_addr(), "simulated device listening");
        Ok(server)
    }

    /// Open discovery sessions of `device`.
    pub fn open_sessions(&self, device: &str) -> usize {
        self.lock()
            .sessions
            .iter()
            .filter(|s| s.key.device == device)
            .count()
    }

    /// Network requests still registered, on any device.
    pub fn active_networks(&self) -> usize {
        self.lock().networks.len()
    }

    fn device_index(&self, name: &str) -> i64 {
        let medium = self.lock();
        let index = medium.devices.iter().position(|d| d == name).unwrap_or(0);
        i64::try_from(index + 1).unwrap_or(i64::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, Medium> {
        self.medium.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a started session and run service matching against the air.
    pub(crate) fn open_session(
        &self,
        key: SessionKey,
        spec: SessionSpec,
        sink: Arc<dyn EventSink>,
        faults: SimFaults,
    ) -> Outbox {
        let mut medium = self.lock();
        let mut outbox = Outbox::default();
        medium.sessions.push(SessionEntry {
            key: key.clone(),
            spec,
            sink,
            faults,
            peers: Vec::new(),
        });

        let counterparts: Vec<SessionKey> = medium
            .sessions
            .iter()
            .filter(|other| other.key.device != key.device)
            .map(|other| other.key.clone())
            .collect();
        for other in counterparts {
            medium.match_pair(&key, &other, &mut outbox);
            medium.match_pair(&other, &key, &mut outbox);
        }
        outbox
    }

    /// Drop one session. False when it was not open.
    pub(crate) fn close_session(&self, key: &SessionKey) -> bool {
        let mut medium = self.lock();
        let before = medium.sessions.len();
        medium.sessions.retain(|s| &s.key != key);
        before != medium.sessions.len()
    }

    /// Drop every session and network request of `device`.
    pub(crate) fn clear_device(&self, device: &str) {
        let mut medium = self.lock();
        medium.sessions.retain(|s| s.key.device != device);
        medium.networks.retain(|n| n.device != device);
        medium.specifiers.retain(|_, link| link.local.device != device);
    }

    /// Send `text` from session `from` to its peer `peer_id`.
    pub(crate) fn send_message(
        &self,
        from: &SessionKey,
        peer_id: i64,
        message_id: i64,
        text: &[u8],
    ) -> Result<Outbox, String> {
        let mut medium = self.lock();
        let mut outbox = Outbox::default();

        let sender = medium
            .session(from)
            .ok_or_else(|| format!("no discovery session {}", from.id))?;
        let remote = sender
            .peer(peer_id)
            .ok_or_else(|| format!("unknown peer {peer_id} on session {}", from.id))?;
        let faults = sender.faults;
        let sender_sink = Arc::clone(&sender.sink);

        let delivered = !faults.send_fails && medium.session(&remote).is_some();
        let outcome = if delivered {
            wire::MESSAGE_SEND_SUCCEEDED
        } else {
            wire::MESSAGE_SEND_FAILED
        };
        outbox.push(
            &sender_sink,
            &from.id,
            wire::MESSAGE_SEND_RESULT,
            json!({"callbackName": outcome, "messageId": message_id}),
        );

        if delivered && !faults.drop_messages {
            let sender_as_seen = medium.peer_id_for(&remote, from);
            if let Some(receiver) = medium.session(&remote) {
                outbox.push(
                    &receiver.sink,
                    &remote.id,
                    wire::ON_MESSAGE_RECEIVED,
                    json!({
                        "peerId": sender_as_seen,
                        "receivedMessage": java_bytes(text),
                    }),
                );
            }
        }
        debug!(from = %from.device, to = %remote.device, message_id, outcome, "message");
        Ok(outbox)
    }

    /// Opaque specifier naming the link from session `from` to its peer.
    pub(crate) fn create_specifier(&self, from: &SessionKey, peer_id: i64) -> Result<String, String> {
        let mut medium = self.lock();
        let session = medium
            .session(from)
            .ok_or_else(|| format!("no discovery session {}", from.id))?;
        let remote = session
            .peer(peer_id)
            .ok_or_else(|| format!("unknown peer {peer_id} on session {}", from.id))?;

        medium.next_specifier += 1;
        let specifier = format!("{:016x}", 0x5157_0000_0000_0000_u64 | medium.next_specifier);
        medium.specifiers.insert(
            specifier.clone(),
            Link {
                local: from.clone(),
                remote,
            },
        );
        Ok(specifier)
    }

    /// Register a network request; the network comes up when the other side asks too.
    pub(crate) fn request_network(
        &self,
        device: &str,
        request_id: &str,
        request: &Value,
        sink: Arc<dyn EventSink>,
        faults: SimFaults,
    ) -> Result<Outbox, String> {
        let transport = request.get("transport_type").and_then(Value::as_i64);
        if transport != Some(wire::TRANSPORT_WIFI_AWARE) {
            return Err(format!("unsupported transport {transport:?}"));
        }
        let specifier = request
            .get("network_specifier")
            .and_then(Value::as_str)
            .ok_or("network request without a specifier")?;

        let mut medium = self.lock();
        let mut outbox = Outbox::default();
        let link = medium
            .specifiers
            .get(specifier)
            .cloned()
            .ok_or_else(|| format!("unknown network specifier {specifier}"))?;
        if link.local.device != device {
            return Err(format!("specifier {specifier} belongs to another device"));
        }

        if faults.network_unavailable {
            outbox.push(
                &sink,
                request_id,
                wire::NETWORK_CALLBACK,
                json!({"callbackName": wire::UNAVAILABLE}),
            );
            return Ok(outbox);
        }

        medium.networks.push(NetworkEntry {
            device: device.to_string(),
            request_id: request_id.to_string(),
            link: link.clone(),
            sink,
            faults,
            established: false,
        });

        let mirror = Link {
            local: link.remote.clone(),
            remote: link.local.clone(),
        };
        let counterpart = medium
            .networks
            .iter()
            .position(|n| !n.established && n.link == mirror);
        if let Some(other) = counterpart {
            medium.next_network += 1;
            let net_id = 100 + medium.next_network;
            let this = medium.networks.len() - 1;
            for index in [this, other] {
                let entry = &mut medium.networks[index];
                entry.established = true;
                outbox.push(
                    &entry.sink,
                    &entry.request_id,
                    wire::NETWORK_CALLBACK,
                    capabilities_changed(net_id, entry.faults),
                );
            }
            info!(a = %link.local.device, b = %link.remote.device, net_id, "Aware network up");
        }
        Ok(outbox)
    }

    /// False when no such request was registered.
    pub(crate) fn unregister_network(&self, device: &str, request_id: &str) -> bool {
        let mut medium = self.lock();
        let before = medium.networks.len();
        medium
            .networks
            .retain(|n| !(n.device == device && n.request_id == request_id));
        before != medium.networks.len()
    }
}

impl Medium {
    fn session(&self, key: &SessionKey) -> Option<&SessionEntry> {
        self.sessions.iter().find(|s| &s.key == key)
    }

    /// Peer id `holder` uses for `other`, allocated on first use.
    fn peer_id_for(&mut self, holder: &SessionKey, other: &SessionKey) -> i64 {
        let next = self.next_peer_id + 1;
        let Some(entry) = self.sessions.iter_mut().find(|s| &s.key == holder) else {
            return 0;
        };
        if let Some((id, _)) = entry.peers.iter().find(|(_, key)| key == other) {
            return *id;
        }
        entry.peers.push((next, other.clone()));
        self.next_peer_id = next;
        next
    }

    /// Report `publisher` to `subscriber` when they match.
    fn match_pair(&mut self, subscriber: &SessionKey, publisher: &SessionKey, outbox: &mut Outbox) {
        let (Some(sub), Some(publ)) = (self.session(subscriber), self.session(publisher)) else {
            return;
        };
        let (Role::Subscribe { max_distance_mm }, Role::Publish { ranging }) =
            (sub.spec.role, publ.spec.role)
        else {
            return;
        };
        if sub.spec.service_name != publ.spec.service_name
            || !filters_match(&sub.spec.filter, &publ.spec.filter)
            || sub.faults.silent_discovery
        {
            return;
        }

        let ranged = ranging && max_distance_mm.is_some();
        if ranged && max_distance_mm.is_some_and(|max| SIMULATED_DISTANCE_MM > max) {
            return;
        }

        let mut ssi = publ.spec.ssi.clone();
        if sub.faults.corrupt_ssi {
            ssi.push(b'!');
        }
        let filter: Vec<Value> = publ
            .spec
            .filter
            .iter()
            .map(|entry| json!({"value": java_bytes(entry)}))
            .collect();
        let sink = Arc::clone(&sub.sink);

        let peer_id = self.peer_id_for(subscriber, publisher);
        let mut data = json!({
            "peerId": peer_id,
            "serviceSpecificInfo": java_bytes(&ssi),
            "matchFilter": filter,
        });
        let name = if ranged {
            data["distanceMm"] = json!(SIMULATED_DISTANCE_MM);
            wire::ON_SERVICE_DISCOVERED_WITHIN_RANGE
        } else {
            wire::ON_SERVICE_DISCOVERED
        };
        debug!(subscriber = %subscriber.device, publisher = %publisher.device, peer_id, name, "service discovered");
        outbox.push(&sink, &subscriber.id, name, data);
    }
}

impl SessionEntry {
    fn peer(&self, peer_id: i64) -> Option<SessionKey> {
        self.peers
            .iter()
            .find(|(id, _)| *id == peer_id)
            .map(|(_, key)| key.clone())
    }
}

/// Filters match when equal or when either side has none.
fn filters_match(a: &[Vec<u8>], b: &[Vec<u8>]) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

fn capabilities_changed(net_id: i64, faults: SimFaults) -> Value {
    let class = if faults.wrong_network_class {
        wire::WIFI_INFO_CLASS
    } else {
        wire::AWARE_NETWORK_INFO_CLASS
    };
    let mut data = json!({
        "callbackName": wire::CAPABILITIES_CHANGED,
        "network": {"netId": net_id},
        "transportInfoClassName": class,
    });
    if !faults.missing_capabilities {
        data["networkCapabilities"] = json!({
            "transportTypes": [wire::TRANSPORT_WIFI_AWARE],
            "linkUpstreamBandwidthKbps": 1024,
            "linkDownstreamBandwidthKbps": 1024,
        });
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_anything() {
        let f = vec![b"x".to_vec()];
        assert!(filters_match(&[], &f));
        assert!(filters_match(&f, &[]));
        assert!(filters_match(&f, &f));
        assert!(!filters_match(&f, &[b"y".to_vec()]));
    }

    #[test]
    fn capability_faults_shape_the_event() {
        let clean = capabilities_changed(7, SimFaults::none());
        assert_eq!(clean["transportInfoClassName"], wire::AWARE_NETWORK_INFO_CLASS);
        assert!(clean.get("networkCapabilities").is_some());

        let faults = SimFaults {
            wrong_network_class: true,
            missing_capabilities: true,
            ..SimFaults::none()
        };
        let broken = capabilities_changed(7, faults);
        assert_eq!(broken["transportInfoClassName"], wire::WIFI_INFO_CLASS);
        assert!(broken.get("networkCapabilities").is_none());
    }
}
