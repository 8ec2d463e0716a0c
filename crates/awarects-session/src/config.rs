//! Run configuration: timeouts and the values every case publishes and sends.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AwareError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const SERVICE_NAME: &str = "CtsVerifierTestService";
pub const PUBLISHER_SSI: &str = "Extra bytes in the publisher discovery";
pub const SUBSCRIBER_SSI: &str = "Arbitrary bytes for the subscribe discovery";
pub const MATCH_FILTER: &str = "bytes used for matching";
pub const TEST_MESSAGE: &str = "test message!";
pub const MESSAGE_ID: i64 = 1234;
pub const LARGE_ENOUGH_DISTANCE_MM: i64 = 100_000;

/// Settings shared by every case in a run.
///
/// Loadable from JSON; missing keys take their defaults. Durations are
/// written as `"30s"` or `"500ms"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Budget for each awaited event.
    #[serde(with = "duration_text")]
    pub timeout: Duration,
    /// Budget the device gets to bring a requested network up.
    #[serde(with = "duration_text")]
    pub request_network_timeout: Duration,
    pub service_name: String,
    pub publisher_ssi: String,
    pub subscriber_ssi: String,
    pub match_filter: String,
    pub message: String,
    pub message_id: i64,
    pub reply_message: String,
    pub reply_message_id: i64,
    pub large_enough_distance_mm: i64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            request_network_timeout: DEFAULT_TIMEOUT,
            service_name: SERVICE_NAME.to_string(),
            publisher_ssi: PUBLISHER_SSI.to_string(),
            subscriber_ssi: SUBSCRIBER_SSI.to_string(),
            match_filter: MATCH_FILTER.to_string(),
            message: TEST_MESSAGE.to_string(),
            message_id: MESSAGE_ID,
            reply_message: "reply message!".to_string(),
            reply_message_id: MESSAGE_ID + 1,
            large_enough_distance_mm: LARGE_ENOUGH_DISTANCE_MM,
        }
    }
}

impl RunConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| AwareError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| AwareError::Config(format!("invalid run config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no case can run with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() || self.request_network_timeout.is_zero() {
            return Err(AwareError::Config("timeouts must be positive".to_string()));
        }
        if self.service_name.is_empty() {
            return Err(AwareError::Config("service_name must not be empty".to_string()));
        }
        if self.message_id == self.reply_message_id {
            return Err(AwareError::Config(
                "message_id and reply_message_id must differ".to_string(),
            ));
        }
        if self.large_enough_distance_mm <= 0 {
            return Err(AwareError::Config(
                "large_enough_distance_mm must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse `"30s"`, `"500ms"`, `"2m"` or a bare number of seconds.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let invalid = || AwareError::Config(format!("invalid duration '{text}'"));

    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

mod duration_text {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
