//! Test cases and the runner that sets up, executes and tears them down.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use awarects_snippet::EventChannel;
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::config::RunConfig;
use crate::discovery::verify_discovery;
use crate::error::{AwareError, Result};
use crate::message::exchange;
use crate::model::{DiscoveryConfig, PublishConfig, PublishType, SubscribeConfig, SubscribeType};
use crate::network::{await_network, request_network};
use crate::orchestrator::DeviceOrchestrator;
use crate::parallel::concurrent_exec;

/// One runnable case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCase {
    /// Parallel attach of both devices.
    Attach,
    /// Attach, discovery, two-way messaging and a network on both devices.
    Discovery,
    /// Discovery with ranging requested on both sides.
    RangedDiscovery,
}

impl TestCase {
    pub const ALL: [TestCase; 3] = [
        TestCase::Attach,
        TestCase::Discovery,
        TestCase::RangedDiscovery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TestCase::Attach => "attach",
            TestCase::Discovery => "discovery",
            TestCase::RangedDiscovery => "ranged-discovery",
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestCase {
    type Err = AwareError;

    fn from_str(s: &str) -> Result<Self> {
        TestCase::ALL
            .into_iter()
            .find(|case| case.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = TestCase::ALL.iter().map(|c| c.name()).collect();
                AwareError::Config(format!(
                    "unknown case '{s}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Collaborator hooks for log capture and failure artifacts.
///
/// Device lifecycle tooling lives outside this crate; the runner only
/// tells it when to act.
pub trait Diagnostics: Send + Sync {
    /// Called for every device after each case, pass or fail.
    fn collect_excerpts(&self, case: TestCase, device: &str);

    /// Called once after a failed case.
    fn on_failure(&self, case: TestCase, devices: &[&str], error: &AwareError);
}

/// Diagnostics that only log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn collect_excerpts(&self, case: TestCase, device: &str) {
        info!(%case, device, "output excerpt boundary");
    }

    fn on_failure(&self, case: TestCase, devices: &[&str], error: &AwareError) {
        error!(%case, ?devices, %error, "case failed; collect bug reports from these devices");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    /// Not run because setup or an earlier case made the devices unusable.
    Aborted,
}

/// Result of one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub case: String,
    pub status: CaseStatus,
    /// Stages completed before the case ended.
    pub stages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teardown_errors: Vec<String>,
    pub duration_ms: u64,
}

impl CaseOutcome {
    fn aborted(case: TestCase, reason: &str) -> Self {
        Self {
            case: case.name().to_string(),
            status: CaseStatus::Aborted,
            stages: Vec::new(),
            error: Some(reason.to_string()),
            error_kind: None,
            teardown_errors: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub publisher: String,
    pub subscriber: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    pub cases: Vec<CaseOutcome>,
}

impl RunReport {
    /// True when setup succeeded and every case passed.
    pub fn passed(&self) -> bool {
        self.setup_error.is_none() && self.cases.iter().all(|c| c.status == CaseStatus::Passed)
    }

    pub fn count(&self, status: CaseStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }

    /// Error kind of the first failed case, if any.
    pub fn first_error_kind(&self) -> Option<&'static str> {
        self.cases.iter().find_map(|c| c.error_kind)
    }
}

/// Runs cases against a publisher and a subscriber device.
pub struct Runner {
    publisher: DeviceOrchestrator,
    subscriber: DeviceOrchestrator,
    config: RunConfig,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Runner {
    pub fn new(
        publisher: Arc<dyn EventChannel>,
        subscriber: Arc<dyn EventChannel>,
        config: RunConfig,
    ) -> Self {
        Self::from_orchestrators(
            DeviceOrchestrator::new(publisher, config.timeout),
            DeviceOrchestrator::new(subscriber, config.timeout),
            config,
        )
    }

    /// Use prepared orchestrators, e.g. ones with a schema registry attached.
    pub fn from_orchestrators(
        publisher: DeviceOrchestrator,
        subscriber: DeviceOrchestrator,
        config: RunConfig,
    ) -> Self {
        Self {
            publisher,
            subscriber,
            config,
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn publisher(&self) -> &DeviceOrchestrator {
        &self.publisher
    }

    pub fn subscriber(&self) -> &DeviceOrchestrator {
        &self.subscriber
    }

    /// Class setup: both devices must have Wi-Fi Aware available.
    pub fn setup(&self) -> Result<()> {
        concurrent_exec(vec![&self.publisher, &self.subscriber], |device| {
            device.check_available().map_err(|err| match err {
                setup @ AwareError::SetupFailure { .. } => setup,
                other => AwareError::SetupFailure {
                    device: device.device_id().to_string(),
                    reason: other.to_string(),
                },
            })
        })?;
        Ok(())
    }

    /// Set up once, then run every case in order.
    ///
    /// A class setup failure aborts all cases. A case failure that loses a
    /// device connection aborts the cases after it.
    pub fn run(&mut self, cases: &[TestCase]) -> RunReport {
        let mut report = RunReport {
            publisher: self.publisher.device_id().to_string(),
            subscriber: self.subscriber.device_id().to_string(),
            setup_error: None,
            cases: Vec::with_capacity(cases.len()),
        };

        if let Err(err) = self.setup() {
            error!(%err, "class setup failed, aborting all cases");
            let reason = err.to_string();
            report.cases = cases
                .iter()
                .map(|case| CaseOutcome::aborted(*case, &reason))
                .collect();
            report.setup_error = Some(reason);
            return report;
        }

        let mut abort_reason: Option<String> = None;
        for &case in cases {
            if let Some(reason) = &abort_reason {
                report.cases.push(CaseOutcome::aborted(case, reason));
                continue;
            }
            let (outcome, fatal) = self.run_case_inner(case);
            if let Some(reason) = fatal {
                abort_reason = Some(reason);
            }
            report.cases.push(outcome);
        }
        report
    }

    /// Run one case with teardown and diagnostics.
    pub fn run_case(&mut self, case: TestCase) -> CaseOutcome {
        self.run_case_inner(case).0
    }

    fn run_case_inner(&mut self, case: TestCase) -> (CaseOutcome, Option<String>) {
        let span = info_span!("case", %case);
        let _enter = span.enter();
        info!("case started");
        let started = Instant::now();

        let mut stages = Vec::new();
        let result = match case {
            TestCase::Attach => attach_both(&mut self.publisher, &mut self.subscriber, &mut stages),
            TestCase::Discovery => discovery_flow(
                &mut self.publisher,
                &mut self.subscriber,
                &self.config,
                false,
                &mut stages,
            ),
            TestCase::RangedDiscovery => discovery_flow(
                &mut self.publisher,
                &mut self.subscriber,
                &self.config,
                true,
                &mut stages,
            ),
        };

        let teardown_errors = self.teardown(case);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(()) => {
                info!(duration_ms, "case passed");
                (
                    CaseOutcome {
                        case: case.name().to_string(),
                        status: CaseStatus::Passed,
                        stages,
                        error: None,
                        error_kind: None,
                        teardown_errors,
                        duration_ms,
                    },
                    None,
                )
            }
            Err(err) => {
                error!(%err, kind = err.kind(), "case failed");
                self.diagnostics.on_failure(
                    case,
                    &[self.publisher.device_id(), self.subscriber.device_id()],
                    &err,
                );
                let fatal = err.aborts_run().then(|| err.to_string());
                (
                    CaseOutcome {
                        case: case.name().to_string(),
                        status: CaseStatus::Failed,
                        stages,
                        error: Some(err.to_string()),
                        error_kind: Some(err.kind()),
                        teardown_errors,
                        duration_ms,
                    },
                    fatal,
                )
            }
        }
    }

    /// Release both devices in parallel. Failures are logged and reported, never raised.
    fn teardown(&mut self, case: TestCase) -> Vec<String> {
        let devices = vec![&mut self.publisher, &mut self.subscriber];
        let errors = concurrent_exec(devices, |device| Ok(device.teardown()))
            .unwrap_or_else(|err| vec![vec![err]]);

        for device in [&self.publisher, &self.subscriber] {
            self.diagnostics.collect_excerpts(case, device.device_id());
        }

        let messages: Vec<String> = errors.into_iter().flatten().map(|e| e.to_string()).collect();
        if !messages.is_empty() {
            warn!(count = messages.len(), "teardown finished with errors");
        }
        messages
    }
}

fn attach_both(
    publisher: &mut DeviceOrchestrator,
    subscriber: &mut DeviceOrchestrator,
    stages: &mut Vec<String>,
) -> Result<()> {
    concurrent_exec(vec![publisher, subscriber], |device| device.attach())?;
    stages.push("attach".to_string());
    Ok(())
}

fn discovery_configs(config: &RunConfig, ranged: bool) -> (PublishConfig, SubscribeConfig) {
    let filter = vec![config.match_filter.as_bytes().to_vec()];
    let publish = PublishConfig::new(&config.service_name)
        .with_service_specific_info(config.publisher_ssi.as_bytes())
        .with_match_filter(filter.clone())
        .with_publish_type(PublishType::Unsolicited)
        .with_ranging(ranged);
    let mut subscribe = SubscribeConfig::new(&config.service_name)
        .with_service_specific_info(config.subscriber_ssi.as_bytes())
        .with_match_filter(filter)
        .with_subscribe_type(SubscribeType::Passive);
    if ranged {
        subscribe = subscribe.with_max_distance_mm(config.large_enough_distance_mm);
    }
    (publish, subscribe)
}

fn discovery_flow(
    publisher: &mut DeviceOrchestrator,
    subscriber: &mut DeviceOrchestrator,
    config: &RunConfig,
    ranged: bool,
    stages: &mut Vec<String>,
) -> Result<()> {
    attach_both(publisher, subscriber, stages)?;

    let (publish, subscribe) = discovery_configs(config, ranged);
    let started = concurrent_exec(
        vec![
            (&mut *publisher, DiscoveryConfig::Publish(publish.clone())),
            (&mut *subscriber, DiscoveryConfig::Subscribe(subscribe)),
        ],
        |(device, session_config)| device.start_session(session_config),
    )?;
    let [pub_session, sub_session]: [_; 2] = started
        .try_into()
        .map_err(|_| AwareError::Internal("expected two sessions".to_string()))?;
    stages.push("sessions".to_string());

    let found = verify_discovery(subscriber, &sub_session, &publish)?;
    stages.push(if ranged { "ranged-discovery" } else { "discovery" }.to_string());
    if ranged {
        return Ok(());
    }

    let subscriber_peer = exchange(
        subscriber,
        &sub_session,
        publisher,
        &pub_session,
        &found.peer,
        &config.message,
        config.message_id,
    )?;
    stages.push("message subscriber->publisher".to_string());

    let publisher_peer = exchange(
        publisher,
        &pub_session,
        subscriber,
        &sub_session,
        &subscriber_peer,
        &config.reply_message,
        config.reply_message_id,
    )?;
    stages.push("message publisher->subscriber".to_string());

    let timeout = config.request_network_timeout;
    let requests = concurrent_exec(
        vec![
            (&mut *publisher, &pub_session, &subscriber_peer),
            (&mut *subscriber, &sub_session, &publisher_peer),
        ],
        |(device, session, peer)| request_network(device, session, peer, timeout),
    )?;
    let [pub_request, sub_request]: [_; 2] = requests
        .try_into()
        .map_err(|_| AwareError::Internal("expected two network requests".to_string()))?;
    stages.push("network requested".to_string());

    concurrent_exec(
        vec![(&*publisher, &pub_request), (&*subscriber, &sub_request)],
        |(device, request)| await_network(device, request),
    )?;
    stages.push("network available".to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::constants::method;
    use crate::testing::{script_attach, scripted, ScriptedAgent, SHORT};

    #[derive(Default)]
    struct Recorder {
        excerpts: Mutex<Vec<(TestCase, String)>>,
        failures: Mutex<Vec<(TestCase, &'static str)>>,
    }

    impl Diagnostics for Recorder {
        fn collect_excerpts(&self, case: TestCase, device: &str) {
            self.excerpts.lock().unwrap().push((case, device.to_string()));
        }

        fn on_failure(&self, case: TestCase, _devices: &[&str], error: &AwareError) {
            self.failures.lock().unwrap().push((case, error.kind()));
        }
    }

    fn runner() -> (Arc<ScriptedAgent>, Arc<ScriptedAgent>, Arc<Recorder>, Runner) {
        let (pub_agent, pub_channel) = scripted("pub");
        let (sub_agent, sub_channel) = scripted("sub");
        let config = RunConfig {
            timeout: SHORT,
            ..RunConfig::default()
        };
        let recorder = Arc::new(Recorder::default());
        let runner = Runner::new(pub_channel, sub_channel, config)
            .with_diagnostics(Arc::clone(&recorder) as Arc<dyn Diagnostics>);
        (pub_agent, sub_agent, recorder, runner)
    }

    #[test]
    fn case_names_parse_back() {
        for case in TestCase::ALL {
            assert_eq!(case.name().parse::<TestCase>().unwrap(), case);
        }
        let err = "bogus".parse::<TestCase>().unwrap_err();
        assert!(err.to_string().contains("ranged-discovery"));
    }

    #[test]
    fn setup_failure_aborts_every_case() {
        let (pub_agent, sub_agent, recorder, mut runner) = runner();
        pub_agent.on_call(method::IS_AVAILABLE, Value::Bool(true));
        sub_agent.on_call(method::IS_AVAILABLE, Value::Bool(false));

        let report = runner.run(&TestCase::ALL);
        assert!(!report.passed());
        assert!(report.setup_error.as_deref().unwrap().contains("sub"));
        assert_eq!(report.count(CaseStatus::Aborted), 3);
        assert!(!sub_agent.methods().iter().any(|m| m == method::ATTACH));
        assert!(recorder.excerpts.lock().unwrap().is_empty());
    }

    #[test]
    fn attach_case_passes_and_tears_down() {
        let (pub_agent, sub_agent, recorder, mut runner) = runner();
        for agent in [&pub_agent, &sub_agent] {
            agent.on_call(method::IS_AVAILABLE, Value::Bool(true));
            script_attach(agent);
        }

        let report = runner.run(&[TestCase::Attach]);
        assert!(report.passed(), "{report:?}");
        assert_eq!(report.cases[0].stages, vec!["attach".to_string()]);
        for agent in [&pub_agent, &sub_agent] {
            assert!(agent.methods().iter().any(|m| m == method::DETACH));
        }
        assert_eq!(recorder.excerpts.lock().unwrap().len(), 2);
        assert!(recorder.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_attach_fails_only_its_case() {
        let (pub_agent, sub_agent, recorder, mut runner) = runner();
        for agent in [&pub_agent, &sub_agent] {
            agent.on_call(method::IS_AVAILABLE, Value::Bool(true));
        }
        script_attach(&pub_agent);
        sub_agent.on_invoke(method::ATTACH, "onAttachFailed", json!({}));

        let report = runner.run(&[TestCase::Attach, TestCase::Attach]);
        assert_eq!(report.count(CaseStatus::Failed), 2);
        assert_eq!(report.cases[0].error_kind, Some("setup_failure"));
        assert_eq!(report.first_error_kind(), Some("setup_failure"));
        assert!(pub_agent.methods().iter().any(|m| m == method::DETACH));
        assert_eq!(recorder.failures.lock().unwrap().len(), 2);
        assert_eq!(recorder.excerpts.lock().unwrap().len(), 4);
    }

    #[test]
    fn report_serializes_statuses_in_snake_case() {
        let report = RunReport {
            publisher: "pub".to_string(),
            subscriber: "sub".to_string(),
            setup_error: None,
            cases: vec![CaseOutcome::aborted(TestCase::Discovery, "gone")],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["cases"][0]["status"], "aborted");
        assert_eq!(value["cases"][0]["case"], "discovery");
        assert!(value.get("setup_error").is_none());
    }
}
