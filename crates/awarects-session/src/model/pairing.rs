use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

/// Set of pairing bootstrapping methods, as the agent's integer bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BootstrappingMethods(u32);

impl BootstrappingMethods {
    pub const OPPORTUNISTIC: Self = Self(1);
    pub const PIN_CODE_DISPLAY: Self = Self(1 << 1);
    pub const PASSPHRASE_DISPLAY: Self = Self(1 << 2);
    pub const QR_DISPLAY: Self = Self(1 << 3);
    pub const NFC_TAG: Self = Self(1 << 4);
    pub const PIN_CODE_KEYPAD: Self = Self(1 << 5);
    pub const PASSPHRASE_KEYPAD: Self = Self(1 << 6);
    pub const QR_SCAN: Self = Self(1 << 7);
    pub const NFC_READER: Self = Self(1 << 8);

    const ALL: [(Self, &'static str); 9] = [
        (Self::OPPORTUNISTIC, "opportunistic"),
        (Self::PIN_CODE_DISPLAY, "pin-code-display"),
        (Self::PASSPHRASE_DISPLAY, "passphrase-display"),
        (Self::QR_DISPLAY, "qr-display"),
        (Self::NFC_TAG, "nfc-tag"),
        (Self::PIN_CODE_KEYPAD, "pin-code-keypad"),
        (Self::PASSPHRASE_KEYPAD, "passphrase-keypad"),
        (Self::QR_SCAN, "qr-scan"),
        (Self::NFC_READER, "nfc-reader"),
    ];

    /// Build from a raw mask, rejecting bits outside the known methods.
    pub fn from_bits(bits: u32) -> Option<Self> {
        let known = Self::ALL.iter().fold(0, |acc, (method, _)| acc | method.0);
        (bits & !known == 0).then_some(Self(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for BootstrappingMethods {
    fn default() -> Self {
        Self::OPPORTUNISTIC
    }
}

impl BitOr for BootstrappingMethods {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BootstrappingMethods {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for BootstrappingMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::ALL
            .iter()
            .filter(|(method, _)| self.contains(*method))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Pairing options attached to a discovery session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PairingConfig {
    pub pairing_cache_enabled: bool,
    pub pairing_setup_enabled: bool,
    pub pairing_verification_enabled: bool,
    pub bootstrapping_methods: BootstrappingMethods,
}
