#![cfg(feature = "schema")]

use std::sync::Arc;
use std::time::Duration;

use awarects_schema::SchemaRegistry;
use awarects_session::{AwareError, CaseStatus, DeviceOrchestrator, RunConfig, Runner, TestCase};
use awarects_sim::{SimAir, SimFaults};
use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(2);

fn runner(air: &SimAir, registry: SchemaRegistry) -> Runner {
    let registry = Arc::new(registry);
    let publisher = DeviceOrchestrator::new(air.local_channel("publisher", SimFaults::none()), TIMEOUT)
        .with_schema_registry(Arc::clone(&registry));
    let subscriber = DeviceOrchestrator::new(air.local_channel("subscriber", SimFaults::none()), TIMEOUT)
        .with_schema_registry(registry);
    let config = RunConfig {
        timeout: TIMEOUT,
        request_network_timeout: TIMEOUT,
        ..RunConfig::default()
    };
    Runner::from_orchestrators(publisher, subscriber, config)
}

#[test]
fn simulated_events_meet_builtin_contracts() {
    let air = SimAir::new();
    let mut runner = runner(&air, SchemaRegistry::builtin().unwrap());
    let report = runner.run(&TestCase::ALL);
    assert!(report.passed(), "{report:#?}");
}

#[test]
fn contract_violation_fails_the_case() {
    let mut registry = SchemaRegistry::builtin().unwrap();
    registry
        .register_value(
            "onServiceDiscovered",
            &json!({"type": "object", "required": ["pairedAlias"]}),
        )
        .unwrap();

    let air = SimAir::new();
    let mut runner = runner(&air, registry);
    let outcome = runner.run_case(TestCase::Discovery);
    assert_eq!(outcome.status, CaseStatus::Failed);
    assert_eq!(outcome.error_kind, Some("schema"));
    assert!(outcome.error.as_deref().unwrap().contains("onServiceDiscovered"));
}

#[test]
fn schema_error_converts() {
    let registry = SchemaRegistry::builtin().unwrap();
    let err: AwareError = registry
        .validate("messageSendResult", &json!({"messageId": 1}))
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), "schema");
}
