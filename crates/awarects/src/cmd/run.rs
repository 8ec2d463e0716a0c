use std::sync::Arc;
use std::time::Duration;

use awarects_schema::SchemaRegistry;
use awarects_session::{parse_duration, DeviceOrchestrator, RunConfig, RunReport, Runner, TestCase};
use awarects_snippet::{connect_with_config, ClientConfig, EventChannel, HandshakeConfig, SnippetClient};
use awarects_transport::DeviceAddr;
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{aware_error, channel_error, report_code, transport_error, CliResult};
use crate::output::{print_report, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let cases = args.cases.cases()?;
    let config = args.cases.run_config()?;
    let registry = args.cases.registry()?;
    let connect_timeout =
        parse_duration(&args.connect_timeout).map_err(|err| aware_error("--connect-timeout", err))?;

    let client_config = ClientConfig {
        rpc_timeout: config.timeout,
        ..ClientConfig::default()
    };
    let publisher = connect_device(&args.publisher, "publisher", connect_timeout, client_config.clone())?;
    let subscriber = connect_device(&args.subscriber, "subscriber", connect_timeout, client_config)?;

    let report = execute(
        Arc::clone(&publisher) as Arc<dyn EventChannel>,
        Arc::clone(&subscriber) as Arc<dyn EventChannel>,
        config,
        registry,
        &cases,
    );
    publisher.close();
    subscriber.close();

    print_report(&report, format);
    Ok(report_code(&report))
}

/// Run `cases` on two connected devices.
pub(crate) fn execute(
    publisher: Arc<dyn EventChannel>,
    subscriber: Arc<dyn EventChannel>,
    config: RunConfig,
    registry: Option<Arc<SchemaRegistry>>,
    cases: &[TestCase],
) -> RunReport {
    let mut publisher = DeviceOrchestrator::new(publisher, config.timeout);
    let mut subscriber = DeviceOrchestrator::new(subscriber, config.timeout);
    if let Some(registry) = registry {
        publisher = publisher.with_schema_registry(Arc::clone(&registry));
        subscriber = subscriber.with_schema_registry(registry);
    }
    info!(cases = cases.len(), timeout = ?config.timeout, "starting run");
    Runner::from_orchestrators(publisher, subscriber, config).run(cases)
}

/// Parse `addr` and open a snippet session with the agent there.
pub(crate) fn connect_device(
    addr: &str,
    device_id: &str,
    handshake_timeout: Duration,
    client_config: ClientConfig,
) -> CliResult<Arc<SnippetClient>> {
    let addr: DeviceAddr = addr
        .parse()
        .map_err(|err| transport_error(&format!("{device_id} address"), err))?;
    let handshake = HandshakeConfig {
        timeout: handshake_timeout,
        ..HandshakeConfig::default()
    };
    let client = connect_with_config(&addr, device_id, &handshake, client_config)
        .map_err(|err| channel_error(&format!("connect {device_id} at {addr}"), err))?;
    Ok(Arc::new(client))
}
