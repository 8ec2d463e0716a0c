use std::io::{Read, Write};
use std::time::{Duration, Instant};

use awarects_frame::{FrameError, LineReader, LineWriter};
use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, Result};

/// Handshake command: open a new agent session.
pub const CMD_INITIATE: &str = "initiate";
/// Handshake command: resume an existing agent session by uid.
pub const CMD_CONTINUE: &str = "continue";

/// Sentinel uid sent with `initiate`.
const UNKNOWN_UID: i64 = -1;

/// Host handshake request, the first line on a fresh connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub cmd: String,
    pub uid: i64,
}

/// Agent handshake response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status: bool,
    pub uid: i64,
}

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Agent-assigned session uid.
    pub uid: i64,
    /// True when an existing session was resumed.
    pub resumed: bool,
}

/// Configuration for the agent handshake.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Timeout for the whole exchange.
    pub timeout: Duration,
    /// Maximum handshake line size in bytes.
    pub max_handshake_line: usize,
    /// Resume this agent session instead of opening a new one.
    pub resume_uid: Option<i64>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_handshake_line: 16 * 1024,
            resume_uid: None,
        }
    }
}

/// Perform the host side of the handshake.
pub fn handshake_client<R: Read, W: Write>(
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
    config: &HandshakeConfig,
) -> Result<HandshakeResult> {
    let req = match config.resume_uid {
        Some(uid) if uid >= 0 => HandshakeRequest {
            cmd: CMD_CONTINUE.to_string(),
            uid,
        },
        Some(uid) => {
            return Err(ChannelError::HandshakeFailed(format!(
                "cannot resume negative uid {uid}"
            )))
        }
        None => HandshakeRequest {
            cmd: CMD_INITIATE.to_string(),
            uid: UNKNOWN_UID,
        },
    };
    send_json(writer, &req)?;

    let deadline = Instant::now() + config.timeout;
    let payload = recv_handshake_line(reader, deadline, config)?;
    let resp: HandshakeResponse = serde_json::from_slice(&payload)?;

    if !resp.status {
        return Err(ChannelError::HandshakeFailed(format!(
            "agent refused '{}' (uid {})",
            req.cmd, req.uid
        )));
    }
    if resp.uid < 0 {
        return Err(ChannelError::HandshakeFailed(format!(
            "agent returned invalid uid {}",
            resp.uid
        )));
    }
    if req.cmd == CMD_CONTINUE && resp.uid != req.uid {
        return Err(ChannelError::HandshakeFailed(format!(
            "resumed uid {} but agent answered {}",
            req.uid, resp.uid
        )));
    }

    Ok(HandshakeResult {
        uid: resp.uid,
        resumed: req.cmd == CMD_CONTINUE,
    })
}

/// Perform the agent side of the handshake, assigning `uid` to new sessions.
pub fn handshake_server<R: Read, W: Write>(
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
    uid: i64,
    config: &HandshakeConfig,
) -> Result<HandshakeResult> {
    let deadline = Instant::now() + config.timeout;
    let payload = recv_handshake_line(reader, deadline, config)?;
    let req: HandshakeRequest = serde_json::from_slice(&payload)?;

    let result = match req.cmd.as_str() {
        CMD_INITIATE => HandshakeResult {
            uid,
            resumed: false,
        },
        CMD_CONTINUE if req.uid == uid => HandshakeResult {
            uid,
            resumed: true,
        },
        other => {
            send_json(
                writer,
                &HandshakeResponse {
                    status: false,
                    uid: req.uid,
                },
            )?;
            return Err(ChannelError::HandshakeFailed(format!(
                "unsupported handshake '{other}' for uid {}",
                req.uid
            )));
        }
    };

    send_json(
        writer,
        &HandshakeResponse {
            status: true,
            uid: result.uid,
        },
    )?;
    Ok(result)
}

pub(crate) fn send_json<T: Serialize, W: Write>(writer: &mut LineWriter<W>, value: &T) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    writer.send(&payload)?;
    Ok(())
}

fn recv_handshake_line<R: Read>(
    reader: &mut LineReader<R>,
    deadline: Instant,
    config: &HandshakeConfig,
) -> Result<Vec<u8>> {
    loop {
        if Instant::now() >= deadline {
            return Err(ChannelError::RpcTimeout {
                method: "handshake".to_string(),
                timeout: config.timeout,
            });
        }

        match reader.read_line() {
            Ok(line) => {
                if line.payload.len() > config.max_handshake_line {
                    return Err(ChannelError::HandshakeFailed(format!(
                        "handshake line too large: {} (max {})",
                        line.payload.len(),
                        config.max_handshake_line
                    )));
                }
                return Ok(line.payload.to_vec());
            }
            Err(err) if err.is_timeout() => continue,
            Err(FrameError::ConnectionClosed) => {
                return Err(ChannelError::Disconnected(
                    "connection closed during handshake".to_string(),
                ));
            }
            Err(err) => return Err(ChannelError::Frame(err)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Cursor, ErrorKind, Read};
    use std::thread;

    use awarects_transport::DeviceStream;

    use super::*;

    fn endpoints(stream: DeviceStream) -> (LineReader<DeviceStream>, LineWriter<DeviceStream>) {
        (
            LineReader::new(stream.try_clone().unwrap()),
            LineWriter::new(stream),
        )
    }

    #[test]
    fn initiate_assigns_uid() {
        let (left, right) = DeviceStream::pair().unwrap();

        let server = thread::spawn(move || {
            let (mut reader, mut writer) = endpoints(left);
            handshake_server(&mut reader, &mut writer, 7, &HandshakeConfig::default()).unwrap()
        });

        let (mut reader, mut writer) = endpoints(right);
        let client = handshake_client(&mut reader, &mut writer, &HandshakeConfig::default()).unwrap();
        let server = server.join().unwrap();

        assert_eq!(client, HandshakeResult { uid: 7, resumed: false });
        assert_eq!(server, client);
    }

    #[test]
    fn continue_resumes_matching_uid() {
        let (left, right) = DeviceStream::pair().unwrap();

        let server = thread::spawn(move || {
            let (mut reader, mut writer) = endpoints(left);
            handshake_server(&mut reader, &mut writer, 3, &HandshakeConfig::default()).unwrap()
        });

        let (mut reader, mut writer) = endpoints(right);
        let cfg = HandshakeConfig {
            resume_uid: Some(3),
            ..HandshakeConfig::default()
        };
        let client = handshake_client(&mut reader, &mut writer, &cfg).unwrap();
        assert!(client.resumed);
        assert!(server.join().unwrap().resumed);
    }

    #[test]
    fn continue_with_unknown_uid_is_refused() {
        let (left, right) = DeviceStream::pair().unwrap();

        let server = thread::spawn(move || {
            let (mut reader, mut writer) = endpoints(left);
            handshake_server(&mut reader, &mut writer, 3, &HandshakeConfig::default())
        });

        let (mut reader, mut writer) = endpoints(right);
        let cfg = HandshakeConfig {
            resume_uid: Some(99),
            ..HandshakeConfig::default()
        };
        let client = handshake_client(&mut reader, &mut writer, &cfg);
        assert!(matches!(client, Err(ChannelError::HandshakeFailed(_))));
        assert!(matches!(
            server.join().unwrap(),
            Err(ChannelError::HandshakeFailed(_))
        ));
    }

    #[test]
    fn invalid_json_rejected() {
        let mut reader = LineReader::new(Cursor::new(b"{not-json\n".to_vec()));
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        let result = handshake_server(&mut reader, &mut writer, 1, &HandshakeConfig::default());
        assert!(matches!(result, Err(ChannelError::Json(_))));
    }

    #[test]
    fn status_false_rejected() {
        let mut reader = LineReader::new(Cursor::new(b"{\"status\":false,\"uid\":-1}\n".to_vec()));
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        let result = handshake_client(&mut reader, &mut writer, &HandshakeConfig::default());
        assert!(matches!(result, Err(ChannelError::HandshakeFailed(_))));
    }

    #[test]
    fn handshake_timeout() {
        let mut reader = LineReader::new(AlwaysTimedOutReader);
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        let cfg = HandshakeConfig {
            timeout: Duration::from_millis(25),
            ..HandshakeConfig::default()
        };
        let result = handshake_client(&mut reader, &mut writer, &cfg);
        assert!(matches!(result, Err(ChannelError::RpcTimeout { .. })));
    }

    #[test]
    fn closed_connection_is_disconnect() {
        let mut reader = LineReader::new(Cursor::new(Vec::<u8>::new()));
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        let result = handshake_client(&mut reader, &mut writer, &HandshakeConfig::default());
        assert!(matches!(result, Err(ChannelError::Disconnected(_))));
    }

    #[test]
    fn rejects_oversized_handshake_line() {
        let mut line = format!("{{\"status\":true,\"uid\":1,\"pad\":\"{}\"}}", "a".repeat(256));
        line.push('\n');
        let mut reader = LineReader::new(Cursor::new(line.into_bytes()));
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        let cfg = HandshakeConfig {
            max_handshake_line: 64,
            ..HandshakeConfig::default()
        };
        let result = handshake_client(&mut reader, &mut writer, &cfg);
        assert!(matches!(result, Err(ChannelError::HandshakeFailed(_))));
    }

    struct AlwaysTimedOutReader;

    impl Read for AlwaysTimedOutReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::TimedOut))
        }
    }
}
