use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Where a device agent listens.
///
/// Accepted forms: `host:port`, `tcp://host:port`, `unix:/path/to.sock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddr {
    /// A TCP endpoint, typically a host port forwarded to the device.
    Tcp(String),
    /// A Unix domain socket path.
    Unix(PathBuf),
}

impl FromStr for DeviceAddr {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if let Some(path) = input.strip_prefix("unix:") {
            let path = path.trim_start_matches("//");
            if path.is_empty() {
                return Err(TransportError::InvalidAddress(input.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        let hostport = input.strip_prefix("tcp://").unwrap_or(input);
        match hostport.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Self::Tcp(hostport.to_string()))
            }
            _ => Err(TransportError::InvalidAddress(input.to_string())),
        }
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(hostport) => write!(f, "tcp://{hostport}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_prefixed_tcp() {
        assert_eq!(
            "127.0.0.1:9999".parse::<DeviceAddr>().unwrap(),
            DeviceAddr::Tcp("127.0.0.1:9999".to_string())
        );
        assert_eq!(
            "tcp://localhost:8080".parse::<DeviceAddr>().unwrap(),
            DeviceAddr::Tcp("localhost:8080".to_string())
        );
    }

    #[test]
    fn parses_unix_path() {
        assert_eq!(
            "unix:/tmp/agent.sock".parse::<DeviceAddr>().unwrap(),
            DeviceAddr::Unix(PathBuf::from("/tmp/agent.sock"))
        );
    }

    #[test]
    fn rejects_missing_port() {
        assert!(matches!(
            "localhost".parse::<DeviceAddr>(),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!("localhost:http".parse::<DeviceAddr>().is_err());
        assert!("unix:".parse::<DeviceAddr>().is_err());
    }

    #[test]
    fn display_is_parseable() {
        let addr = DeviceAddr::Tcp("10.0.0.2:4000".to_string());
        assert_eq!(addr.to_string().parse::<DeviceAddr>().unwrap(), addr);
    }
}
