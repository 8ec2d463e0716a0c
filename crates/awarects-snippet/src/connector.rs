use awarects_frame::{LineConfig, LineReader, LineWriter};
use awarects_transport::{DeviceAddr, DeviceStream};
use tracing::info;

use crate::client::{ClientConfig, SnippetClient};
use crate::error::Result;
use crate::handshake::{handshake_client, HandshakeConfig};

/// Connect to a device agent and open a new session.
pub fn connect(addr: &DeviceAddr, device_id: &str) -> Result<SnippetClient> {
    connect_with_config(
        addr,
        device_id,
        &HandshakeConfig::default(),
        ClientConfig::default(),
    )
}

/// Connect with explicit handshake and client configuration.
pub fn connect_with_config(
    addr: &DeviceAddr,
    device_id: &str,
    handshake_config: &HandshakeConfig,
    client_config: ClientConfig,
) -> Result<SnippetClient> {
    let stream = DeviceStream::connect(addr)?;
    let reader_stream = stream.try_clone()?;

    let line_config = LineConfig {
        max_line_size: handshake_config.max_handshake_line,
        read_timeout: Some(handshake_config.timeout),
        write_timeout: Some(handshake_config.timeout),
    };

    let mut reader = LineReader::with_config_device(reader_stream, line_config.clone())?;
    let mut writer = LineWriter::with_config_device(stream, line_config)?;

    let handshake = handshake_client(&mut reader, &mut writer, handshake_config)?;
    info!(device = device_id, %addr, uid = handshake.uid, "connected to snippet agent");

    SnippetClient::from_parts(device_id, reader, writer, handshake, client_config)
}
