use std::io::IsTerminal;

use awarects_session::{CaseStatus, RunReport};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    schema_id: &'static str,
    overall: &'static str,
    passed: usize,
    failed: usize,
    aborted: usize,
    #[serde(flatten)]
    report: &'a RunReport,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_report(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ReportOutput {
            schema_id: "https://schemas.awarects.dev/cli/v1/run-report.schema.json",
            overall: overall(report),
            passed: report.count(CaseStatus::Passed),
            failed: report.count(CaseStatus::Failed),
            aborted: report.count(CaseStatus::Aborted),
            report,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CASE", "STATUS", "TIME", "LAST STAGE", "ERROR"]);
            for case in &report.cases {
                table.add_row(vec![
                    case.case.clone(),
                    status_text(case.status).to_string(),
                    format!("{} ms", case.duration_ms),
                    case.stages.last().cloned().unwrap_or_else(|| "-".to_string()),
                    case.error.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
            print_footer(report);
        }
        OutputFormat::Pretty => {
            println!("awarects {} -> {}\n", report.publisher, report.subscriber);
            for case in &report.cases {
                println!(
                    "  [{:>5}] {:<18} {:>6} ms",
                    status_text(case.status),
                    case.case,
                    case.duration_ms
                );
                for stage in &case.stages {
                    println!("           ok  {stage}");
                }
                if let Some(error) = &case.error {
                    println!("           err {error}");
                }
                for teardown in &case.teardown_errors {
                    println!("           teardown {teardown}");
                }
            }
            println!();
            print_footer(report);
        }
    }
}

fn print_footer(report: &RunReport) {
    if let Some(setup) = &report.setup_error {
        println!("Setup failed: {setup}");
    }
    println!(
        "Result: {} ({} passed, {} failed, {} aborted)",
        overall(report),
        report.count(CaseStatus::Passed),
        report.count(CaseStatus::Failed),
        report.count(CaseStatus::Aborted)
    );
}

fn overall(report: &RunReport) -> &'static str {
    if report.passed() {
        "pass"
    } else {
        "fail"
    }
}

pub fn status_text(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Passed => "PASS",
        CaseStatus::Failed => "FAIL",
        CaseStatus::Aborted => "ABORT",
    }
}
