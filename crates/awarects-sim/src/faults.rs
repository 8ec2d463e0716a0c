use std::fmt;
use std::str::FromStr;

/// Misbehaviours a simulated device can be told to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimFaults {
    /// `wifiAwareIsAvailable` answers false.
    pub unavailable: bool,
    /// Attach reports `onAttachFailed`.
    pub attach_fails: bool,
    /// Publish and subscribe report `onSessionConfigFailed`.
    pub config_fails: bool,
    /// Outgoing messages report `onMessageSendFailed`.
    pub send_fails: bool,
    /// Outgoing messages report success but never arrive.
    pub drop_messages: bool,
    /// Network requests report `onUnavailable`.
    pub network_unavailable: bool,
    /// Discovery reports a service-specific info that differs from the publisher's.
    pub corrupt_ssi: bool,
    /// Subscribe sessions never report a discovery.
    pub silent_discovery: bool,
    /// Networks come up with a non-Aware transport info class.
    pub wrong_network_class: bool,
    /// Networks come up without capabilities.
    pub missing_capabilities: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fault '{0}' (expected one of: {known})", known = SimFaults::NAMES.join(", "))]
pub struct UnknownFault(pub String);

impl SimFaults {
    pub const NAMES: [&'static str; 10] = [
        "unavailable",
        "attach-fails",
        "config-fails",
        "send-fails",
        "drop-messages",
        "network-unavailable",
        "corrupt-ssi",
        "silent-discovery",
        "wrong-network-class",
        "missing-capabilities",
    ];

    pub fn none() -> Self {
        Self::default()
    }

    /// Turn on the fault called `name`.
    pub fn enable(&mut self, name: &str) -> Result<(), UnknownFault> {
        let flag = match name.trim().replace('_', "-").as_str() {
            "unavailable" => &mut self.unavailable,
            "attach-fails" => &mut self.attach_fails,
            "config-fails" => &mut self.config_fails,
            "send-fails" => &mut self.send_fails,
            "drop-messages" => &mut self.drop_messages,
            "network-unavailable" => &mut self.network_unavailable,
            "corrupt-ssi" => &mut self.corrupt_ssi,
            "silent-discovery" => &mut self.silent_discovery,
            "wrong-network-class" => &mut self.wrong_network_class,
            "missing-capabilities" => &mut self.missing_capabilities,
            _ => return Err(UnknownFault(name.to_string())),
        };
        *flag = true;
        Ok(())
    }

    /// Names of the faults that are on.
    pub fn active(&self) -> Vec<&'static str> {
        let flags = [
            self.unavailable,
            self.attach_fails,
            self.config_fails,
            self.send_fails,
            self.drop_messages,
            self.network_unavailable,
            self.corrupt_ssi,
            self.silent_discovery,
            self.wrong_network_class,
            self.missing_capabilities,
        ];
        Self::NAMES
            .iter()
            .zip(flags)
            .filter_map(|(name, on)| on.then_some(*name))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Comma-separated fault names; empty means none.
impl FromStr for SimFaults {
    type Err = UnknownFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut faults = SimFaults::default();
        for name in s.split(',').filter(|n| !n.trim().is_empty()) {
            faults.enable(name)?;
        }
        Ok(faults)
    }
}

impl fmt::Display for SimFaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active();
        if active.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&active.join(","))
        }
    }
}
