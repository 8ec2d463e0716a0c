use std::path::PathBuf;
use std::sync::Arc;

use awarects_schema::{RegistryConfig, SchemaRegistry};
use awarects_session::{parse_duration, RunConfig, TestCase};
use clap::{Args, Subcommand};

use crate::exit::{aware_error, schema_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod commit_check;
pub mod probe;
pub mod run;
pub mod selftest;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to two device agents and run test cases.
    Run(RunArgs),
    /// Run test cases against simulated devices.
    Selftest(SelftestArgs),
    /// Handshake with one agent and report Aware support.
    Probe(ProbeArgs),
    /// Check a commit message against the changed files.
    CommitCheck(CommitCheckArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Selftest(args) => selftest::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::CommitCheck(args) => commit_check::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every command that runs cases.
#[derive(Args, Debug)]
pub struct CaseArgs {
    /// Cases to run (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub case: Vec<String>,
    /// Run configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Per-event wait budget (e.g. 30s, 500ms). Overrides the config file.
    #[arg(long)]
    pub timeout: Option<String>,
    /// Validate device events against the built-in payload contracts.
    #[arg(long)]
    pub validate: bool,
    /// Load extra or replacement contracts from a directory; implies --validate.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,
    /// Reject event keys the contracts do not list.
    #[arg(long)]
    pub strict: bool,
}

impl CaseArgs {
    pub fn cases(&self) -> CliResult<Vec<TestCase>> {
        if self.case.is_empty() {
            return Ok(TestCase::ALL.to_vec());
        }
        self.case
            .iter()
            .map(|name| {
                name.trim()
                    .parse::<TestCase>()
                    .map_err(|err| CliError::usage(err.to_string()))
            })
            .collect()
    }

    pub fn run_config(&self) -> CliResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => {
                RunConfig::from_file(path).map_err(|err| aware_error("config", err))?
            }
            None => RunConfig::default(),
        };
        if let Some(timeout) = &self.timeout {
            let timeout = parse_duration(timeout).map_err(|err| aware_error("--timeout", err))?;
            config.timeout = timeout;
            config.request_network_timeout = timeout;
        }
        config.validate().map_err(|err| aware_error("config", err))?;
        Ok(config)
    }

    /// Contract registry when validation was asked for.
    pub fn registry(&self) -> CliResult<Option<Arc<SchemaRegistry>>> {
        if !self.validate && self.schema_dir.is_none() {
            return Ok(None);
        }
        let config = RegistryConfig {
            strict_mode: self.strict,
            ..RegistryConfig::default()
        };
        let mut registry = SchemaRegistry::builtin_with_config(config)
            .map_err(|err| schema_error("built-in contracts", err))?;
        if let Some(dir) = &self.schema_dir {
            let loaded = registry
                .load_directory(dir)
                .map_err(|err| schema_error("schema dir", err))?;
            tracing::info!(loaded, dir = %dir.display(), "loaded event contracts");
        }
        Ok(Some(Arc::new(registry)))
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Publisher agent address (host:port or unix:/path).
    pub publisher: String,
    /// Subscriber agent address (host:port or unix:/path).
    pub subscriber: String,
    /// Handshake timeout per device.
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
    #[command(flatten)]
    pub cases: CaseArgs,
}

#[derive(Args, Debug)]
pub struct SelftestArgs {
    /// Misbehaviour for a simulated device, as [publisher:|subscriber:]NAME.
    /// Without a device prefix the subscriber gets it. Repeatable.
    #[arg(long, value_name = "FAULT")]
    pub fault: Vec<String>,
    /// Serve the simulated devices over loopback TCP instead of in process.
    #[arg(long)]
    pub wire: bool,
    #[command(flatten)]
    pub cases: CaseArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Agent address (host:port or unix:/path).
    pub addr: String,
    /// Give up connecting after this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct CommitCheckArgs {
    /// Commit message.
    pub message: String,
    /// Files changed in the commit.
    pub files: Vec<String>,
    /// Treat the branch as tracking AOSP (skips the check). Default: ask git.
    #[arg(long, value_name = "BOOL")]
    pub aosp: Option<bool>,
    /// Whether the commit diff touches XML_TAG. Default: ask git.
    #[arg(long, value_name = "BOOL")]
    pub xml_tag_changed: Option<bool>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
