use std::sync::Arc;
use std::time::Duration;

use awarects_session::RunReport;
use awarects_sim::{SimAir, SimFaults};
use awarects_snippet::{ClientConfig, EventChannel};
use tracing::{info, warn};

use crate::cmd::run::{connect_device, execute};
use crate::cmd::SelftestArgs;
use crate::exit::{channel_error, report_code, CliError, CliResult};
use crate::output::{print_report, OutputFormat};

const DEVICES: [&str; 2] = ["publisher", "subscriber"];

pub fn run(args: SelftestArgs, format: OutputFormat) -> CliResult<i32> {
    let cases = args.cases.cases()?;
    let config = args.cases.run_config()?;
    let registry = args.cases.registry()?;
    let faults = parse_faults(&args.fault)?;
    info!(publisher = %faults[0], subscriber = %faults[1], wire = args.wire, "selftest");

    let air = SimAir::new();
    let report = if args.wire {
        let client_config = ClientConfig {
            rpc_timeout: config.timeout,
            ..ClientConfig::default()
        };
        over_wire(&air, faults, client_config, |publisher, subscriber| {
            execute(publisher, subscriber, config, registry, &cases)
        })?
    } else {
        execute(
            air.local_channel(DEVICES[0], faults[0]),
            air.local_channel(DEVICES[1], faults[1]),
            config,
            registry,
            &cases,
        )
    };

    print_report(&report, format);
    Ok(report_code(&report))
}

/// Serve both simulated devices on loopback and run `body` against real clients.
fn over_wire<F>(
    air: &SimAir,
    faults: [SimFaults; 2],
    client_config: ClientConfig,
    body: F,
) -> CliResult<RunReport>
where
    F: FnOnce(Arc<dyn EventChannel>, Arc<dyn EventChannel>) -> RunReport,
{
    let mut servers = Vec::with_capacity(DEVICES.len());
    let mut clients = Vec::with_capacity(DEVICES.len());
    for (name, faults) in DEVICES.into_iter().zip(faults) {
        let server = air
            .serve(name, faults, "127.0.0.1:0")
            .map_err(|err| channel_error(&format!("serve {name}"), err))?;
        let addr = server.local_addr().to_string();
        servers.push(
            server
                .spawn_one()
                .map_err(|err| channel_error(&format!("serve {name}"), err))?,
        );
        clients.push(connect_device(
            &addr,
            name,
            Duration::from_secs(5),
            client_config.clone(),
        )?);
    }

    let report = body(
        Arc::clone(&clients[0]) as Arc<dyn EventChannel>,
        Arc::clone(&clients[1]) as Arc<dyn EventChannel>,
    );

    for client in &clients {
        client.close();
    }
    for server in servers {
        match server.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%err, "simulated agent ended with an error"),
            Err(_) => warn!("simulated agent thread panicked"),
        }
    }
    Ok(report)
}

/// `[publisher:|subscriber:]NAME`, subscriber by default.
fn parse_faults(specs: &[String]) -> CliResult<[SimFaults; 2]> {
    let mut faults = [SimFaults::none(); 2];
    for spec in specs {
        let (index, name) = match spec.split_once(':') {
            Some((device, name)) => {
                let index = DEVICES.iter().position(|d| *d == device).ok_or_else(|| {
                    CliError::usage(format!(
                        "unknown device '{device}' in fault '{spec}' (expected publisher or subscriber)"
                    ))
                })?;
                (index, name)
            }
            None => (1, spec.as_str()),
        };
        faults[index]
            .enable(name)
            .map_err(|err| CliError::usage(err.to_string()))?;
    }
    Ok(faults)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_default_to_subscriber() {
        let faults = parse_faults(&["corrupt-ssi".to_string()]).unwrap();
        assert!(faults[0].is_clean());
        assert!(faults[1].corrupt_ssi);
    }

    #[test]
    fn faults_can_target_publisher() {
        let faults = parse_faults(&[
            "publisher:send-fails".to_string(),
            "publisher:drop-messages".to_string(),
        ])
        .unwrap();
        assert!(faults[0].send_fails && faults[0].drop_messages);
        assert!(faults[1].is_clean());
    }

    #[test]
    fn bad_fault_is_usage() {
        let err = parse_faults(&["router:unavailable".to_string()]).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
        let err = parse_faults(&["melt".to_string()]).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
