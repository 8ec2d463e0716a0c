use std::sync::Arc;
use std::time::Duration;

use awarects_session::{CaseStatus, RunConfig, Runner, TestCase};
use awarects_sim::{SimAir, SimFaults};
use awarects_snippet::EventChannel;

fn config() -> RunConfig {
    RunConfig {
        timeout: Duration::from_secs(2),
        request_network_timeout: Duration::from_secs(2),
        ..RunConfig::default()
    }
}

fn runner(air: &SimAir, publisher: SimFaults, subscriber: SimFaults) -> Runner {
    let pub_channel: Arc<dyn EventChannel> = air.local_channel("publisher", publisher);
    let sub_channel: Arc<dyn EventChannel> = air.local_channel("subscriber", subscriber);
    Runner::new(pub_channel, sub_channel, config())
}

fn fault(name: &str) -> SimFaults {
    name.parse().unwrap()
}

#[test]
fn all_cases_pass_on_a_clean_air() {
    let air = SimAir::new();
    let mut runner = runner(&air, SimFaults::none(), SimFaults::none());

    let report = runner.run(&TestCase::ALL);
    assert!(report.passed(), "{report:#?}");
    let discovery = &report.cases[1];
    assert_eq!(
        discovery.stages,
        [
            "attach",
            "sessions",
            "discovery",
            "message subscriber->publisher",
            "message publisher->subscriber",
            "network requested",
            "network available",
        ]
    );
    assert_eq!(
        report.cases[2].stages.last().map(String::as_str),
        Some("ranged-discovery")
    );

    assert_eq!(air.open_sessions("publisher"), 0);
    assert_eq!(air.open_sessions("subscriber"), 0);
    assert_eq!(air.active_networks(), 0);
}

#[test]
fn unavailable_device_aborts_the_run() {
    let air = SimAir::new();
    let mut runner = runner(&air, SimFaults::none(), fault("unavailable"));

    let report = runner.run(&TestCase::ALL);
    assert!(!report.passed());
    assert!(report.setup_error.is_some());
    assert_eq!(report.count(CaseStatus::Aborted), TestCase::ALL.len());
}

#[test]
fn corrupted_discovery_payload_is_a_mismatch() {
    let air = SimAir::new();
    let mut runner = runner(&air, SimFaults::none(), fault("corrupt-ssi"));

    let report = runner.run(&TestCase::ALL);
    let statuses: Vec<CaseStatus> = report.cases.iter().map(|c| c.status).collect();
    assert_eq!(
        statuses,
        [CaseStatus::Passed, CaseStatus::Failed, CaseStatus::Failed]
    );
    assert_eq!(report.cases[1].error_kind, Some("payload_mismatch"));
    assert!(report.cases[1]
        .error
        .as_deref()
        .unwrap()
        .contains("serviceSpecificInfo"));
    assert_eq!(air.open_sessions("publisher"), 0);
}

#[test]
fn failed_send_is_an_unexpected_callback() {
    let air = SimAir::new();
    let mut runner = runner(&air, SimFaults::none(), fault("send-fails"));

    let outcome = runner.run_case(TestCase::Discovery);
    assert_eq!(outcome.status, CaseStatus::Failed);
    assert_eq!(outcome.error_kind, Some("unexpected_callback"));
    assert_eq!(outcome.stages.last().map(String::as_str), Some("discovery"));
}

#[test]
fn dropped_message_times_out() {
    let air = SimAir::new();
    let mut runner = runner(&air, fault("drop-messages"), SimFaults::none());

    let outcome = runner.run_case(TestCase::Discovery);
    assert_eq!(outcome.error_kind, Some("timeout"));
    assert_eq!(
        outcome.stages.last().map(String::as_str),
        Some("message subscriber->publisher")
    );
}

#[test]
fn unavailable_network_fails_and_is_released() {
    let air = SimAir::new();
    let mut runner = runner(&air, fault("network-unavailable"), SimFaults::none());

    let outcome = runner.run_case(TestCase::Discovery);
    assert_eq!(outcome.status, CaseStatus::Failed);
    assert_eq!(outcome.error_kind, Some("setup_failure"));
    assert!(outcome.error.as_deref().unwrap().contains("onUnavailable"));
    assert_eq!(air.active_networks(), 0);
}

#[test]
fn wrong_transport_class_is_a_mismatch() {
    let air = SimAir::new();
    let mut runner = runner(&air, fault("wrong-network-class"), SimFaults::none());

    let outcome = runner.run_case(TestCase::Discovery);
    assert_eq!(outcome.error_kind, Some("payload_mismatch"));
    assert!(outcome
        .error
        .as_deref()
        .unwrap()
        .contains("transportInfoClassName"));
}

#[test]
fn session_config_failure_is_reported() {
    let air = SimAir::new();
    let mut runner = runner(&air, fault("config-fails"), SimFaults::none());

    let report = runner.run(&[TestCase::Discovery, TestCase::Attach]);
    assert_eq!(report.cases[0].error_kind, Some("unexpected_callback"));
    assert_eq!(report.cases[1].status, CaseStatus::Passed);
}
