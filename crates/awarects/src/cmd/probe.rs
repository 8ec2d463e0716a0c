use std::time::{Duration, Instant};

use awarects_session::constants::method::{IS_AVAILABLE, IS_PAIRING_SUPPORTED};
use awarects_session::parse_duration;
use awarects_snippet::{
    connect_with_config, ChannelError, ClientConfig, EventChannel, HandshakeConfig, SnippetClient,
};
use awarects_transport::{DeviceAddr, TransportError};
use serde::Serialize;
use serde_json::Value;

use crate::cmd::ProbeArgs;
use crate::exit::{
    aware_error, channel_error, transport_error, CliError, CliResult, CHECK_FAILED, SUCCESS,
    TIMEOUT,
};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput {
    schema_id: &'static str,
    addr: String,
    uid: i64,
    aware_available: bool,
    pairing_supported: bool,
    rpc_latency_ms: f64,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout).map_err(|err| aware_error("--timeout", err))?;
    let addr: DeviceAddr = args
        .addr
        .parse()
        .map_err(|err| transport_error("address", err))?;

    let client = connect_with_timeout(&addr, timeout)?;
    let started = Instant::now();
    let available = ask(&client, IS_AVAILABLE);
    let pairing = ask(&client, IS_PAIRING_SUPPORTED);
    let elapsed = started.elapsed();
    client.close();

    let out = ProbeOutput {
        schema_id: "https://schemas.awarects.dev/cli/v1/probe.schema.json",
        addr: addr.to_string(),
        uid: client.uid(),
        aware_available: available?,
        pairing_supported: pairing?,
        rpc_latency_ms: (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
    };
    print_probe(&out, format);

    Ok(if out.aware_available {
        SUCCESS
    } else {
        CHECK_FAILED
    })
}

fn ask(client: &SnippetClient, method: &str) -> CliResult<bool> {
    let value = client
        .call(method, Vec::new())
        .map_err(|err| channel_error(method, err))?;
    match value {
        Value::Bool(flag) => Ok(flag),
        other => Err(CliError::new(
            crate::exit::DATA_INVALID,
            format!("{method}: expected a boolean, got {other}"),
        )),
    }
}

fn connect_with_timeout(addr: &DeviceAddr, timeout: Duration) -> CliResult<SnippetClient> {
    let handshake = HandshakeConfig {
        timeout,
        ..HandshakeConfig::default()
    };
    let client_config = ClientConfig {
        rpc_timeout: timeout,
        ..ClientConfig::default()
    };
    let start = Instant::now();
    loop {
        match connect_with_config(addr, "probe", &handshake, client_config.clone()) {
            Ok(client) => return Ok(client),
            Err(err) => {
                if !is_retryable_connect_error(&err) {
                    return Err(channel_error("connect failed", err));
                }
                if start.elapsed() >= timeout {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("connect timed out after {timeout:?}"),
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

fn is_retryable_connect_error(err: &ChannelError) -> bool {
    match err {
        ChannelError::Transport(TransportError::Connect { source, .. }) => {
            source.kind() == std::io::ErrorKind::NotFound
                || source.kind() == std::io::ErrorKind::ConnectionRefused
        }
        _ => false,
    }
}

fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Agent:");
            println!("  Address:           {}", out.addr);
            println!("  Session uid:       {}", out.uid);
            println!("  Aware available:   {}", yes_no(out.aware_available));
            println!("  Pairing supported: {}", yes_no(out.pairing_supported));
            println!("  RPC latency:       {:.2}ms", out.rpc_latency_ms);
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
