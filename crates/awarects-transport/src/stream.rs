use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::addr::DeviceAddr;
use crate::error::{Result, TransportError};

/// A connected agent stream. Implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
pub struct DeviceStream {
    inner: DeviceStreamInner,
}

enum DeviceStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            DeviceStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl DeviceStream {
    /// Connect to a device agent (blocking).
    pub fn connect(addr: &DeviceAddr) -> Result<Self> {
        match addr {
            DeviceAddr::Tcp(hostport) => {
                let stream =
                    TcpStream::connect(hostport.as_str()).map_err(|e| TransportError::Connect {
                        addr: addr.to_string(),
                        source: e,
                    })?;
                stream.set_nodelay(true)?;
                debug!(%addr, "connected to device agent");
                Ok(Self::from_tcp(stream))
            }
            #[cfg(unix)]
            DeviceAddr::Unix(path) => {
                let stream = std::os::unix::net::UnixStream::connect(path).map_err(|e| {
                    TransportError::Connect {
                        addr: addr.to_string(),
                        source: e,
                    }
                })?;
                debug!(%addr, "connected to device agent");
                Ok(Self::from_unix(stream))
            }
            #[cfg(not(unix))]
            DeviceAddr::Unix(_) => Err(TransportError::Unsupported(addr.to_string())),
        }
    }

    /// Create a DeviceStream from a TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: DeviceStreamInner::Tcp(stream),
        }
    }

    /// Create a DeviceStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: DeviceStreamInner::Unix(stream),
        }
    }

    /// A connected in-process pair, for tests and loopback agents.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            DeviceStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            DeviceStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            DeviceStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both halves, waking any thread blocked in `read`.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            DeviceStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            DeviceStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            DeviceStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            DeviceStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
