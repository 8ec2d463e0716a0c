mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "awarects", version, about = "Two-device Wi-Fi Aware conformance runner")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "awarects",
            "run",
            "127.0.0.1:9001",
            "127.0.0.1:9002",
            "--case",
            "attach,discovery",
            "--timeout",
            "10s",
        ])
        .expect("run args should parse");

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.cases.case, vec!["attach", "discovery"]);
        assert_eq!(args.cases.timeout.as_deref(), Some("10s"));
    }

    #[test]
    fn parses_selftest_faults() {
        let cli = Cli::try_parse_from([
            "awarects",
            "--format",
            "json",
            "selftest",
            "--fault",
            "publisher:send-fails",
            "--fault",
            "corrupt-ssi",
            "--wire",
        ])
        .expect("selftest args should parse");

        let Command::Selftest(args) = cli.command else {
            panic!("expected selftest");
        };
        assert_eq!(args.fault.len(), 2);
        assert!(args.wire);
    }

    #[test]
    fn run_needs_both_devices() {
        let err = Cli::try_parse_from(["awarects", "run", "127.0.0.1:9001"])
            .expect_err("one address should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_commit_check_overrides() {
        let cli = Cli::try_parse_from([
            "awarects",
            "commit-check",
            "Fix thing\n\nBug: 1",
            "service/ServiceWifiResources/res/values/config.xml",
            "--aosp",
            "false",
            "--xml-tag-changed",
            "true",
        ])
        .expect("commit-check args should parse");
        let Command::CommitCheck(args) = cli.command else {
            panic!("expected commit-check");
        };
        assert_eq!(args.aosp, Some(false));
        assert_eq!(args.xml_tag_changed, Some(true));
        assert_eq!(args.files.len(), 1);
    }
}
