use std::process::Command;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cmd::CommitCheckArgs;
use crate::exit::{io_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, OutputFormat};

const BASE_DIR: &str = "service/ServiceWifiResources/res/";
const OVERLAY_FILE: &str = "service/ServiceWifiResources/res/values/overlayable.xml";
const STRING_FILE: &str = "service/ServiceWifiResources/res/values/strings.xml";
const RESOURCE_FILES: [&str; 3] = ["values/strings.xml", "values/config.xml", "values/styles.xml"];
const RESOURCE_DIRS: [&str; 2] = ["drawable/", "layout/"];

const WIFI_SERVICE_DIR: &str = "service/java/com/android/server/wifi/";
const BACKUP_PARSER_FILE: &str = "service/java/com/android/server/wifi/WifiBackupDataV1Parser.java";
const XML_FILES: [&str; 3] = [
    "util/XmlUtil.java",
    "WifiBackupRestore.java",
    "WifiBackupDataV1Parser.java",
];

const TRANSLATION_BUG: &str = "Bug: 294871353";
const OVERLAYABLE_TAG: &str = "Updated-Overlayable:";
const CLOUD_BACKUP_TAG: &str = "Reviewed-Cloud-B&R:";
const XML_TAG: &str = "XML_TAG";

/// One missing acknowledgement in a commit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub file: String,
    pub required: &'static str,
    pub reason: String,
    pub examples: Vec<&'static str>,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    schema_id: &'static str,
    skipped: bool,
    passed: bool,
    findings: &'a [Finding],
}

pub fn run(args: CommitCheckArgs, format: OutputFormat) -> CliResult<i32> {
    let aosp = match args.aosp {
        Some(aosp) => aosp,
        None => on_aosp_branch()?,
    };

    let findings = if aosp {
        debug!("branch tracks aosp, skipping commit check");
        Vec::new()
    } else {
        let xml_tag_changed = match args.xml_tag_changed {
            Some(changed) => changed,
            None if changed_xml_file(&args.files).is_some() => diff_touches_xml_tag()?,
            None => false,
        };
        check(&args.message, &args.files, xml_tag_changed)
    };

    print_check(
        &CheckOutput {
            schema_id: "https://schemas.awarects.dev/cli/v1/commit-check.schema.json",
            skipped: aosp,
            passed: findings.is_empty(),
            findings: &findings,
        },
        format,
    );
    Ok(if findings.is_empty() { SUCCESS } else { FAILURE })
}

/// Every acknowledgement the message is missing for the changed files.
pub fn check(message: &str, files: &[String], xml_tag_changed: bool) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(file) = changed_resource_file(files) {
        if files.iter().any(|f| f == STRING_FILE) && !has_line(message, TRANSLATION_BUG) {
            findings.push(Finding {
                file: STRING_FILE.to_string(),
                required: TRANSLATION_BUG,
                reason: "string resources changed; link the translation bug".to_string(),
                examples: vec![TRANSLATION_BUG],
            });
        }
        if !has_line(message, OVERLAYABLE_TAG) {
            findings.push(Finding {
                file: file.to_string(),
                required: OVERLAYABLE_TAG,
                reason: format!(
                    "if overlayable resources used by the Wifi module changed, update {OVERLAY_FILE}"
                ),
                examples: vec![
                    "Updated-Overlayable: TRUE",
                    "Updated-Overlayable: Not applicable - changing default value",
                ],
            });
        }
    }

    if xml_tag_changed {
        if let Some(file) = changed_xml_file(files) {
            if !has_line(message, CLOUD_BACKUP_TAG) {
                findings.push(Finding {
                    file: file.to_string(),
                    required: CLOUD_BACKUP_TAG,
                    reason: format!(
                        "xml format changed; review cloud backup and restore in {BACKUP_PARSER_FILE}"
                    ),
                    examples: vec![
                        "Reviewed-Cloud-B&R: TRUE",
                        "Reviewed-Cloud-B&R: Not applicable - not xml format change",
                    ],
                });
            }
        }
    }

    findings
}

fn changed_resource_file(files: &[String]) -> Option<&str> {
    files.iter().map(String::as_str).find(|file| {
        file.strip_prefix(BASE_DIR).is_some_and(|rest| {
            RESOURCE_FILES.contains(&rest) || RESOURCE_DIRS.iter().any(|dir| rest.starts_with(dir))
        })
    })
}

fn changed_xml_file(files: &[String]) -> Option<&str> {
    files.iter().map(String::as_str).find(|file| {
        file.strip_prefix(WIFI_SERVICE_DIR)
            .is_some_and(|rest| XML_FILES.contains(&rest))
    })
}

fn has_line(message: &str, prefix: &str) -> bool {
    let prefix = prefix.to_ascii_lowercase();
    message
        .lines()
        .any(|line| line.trim().to_ascii_lowercase().starts_with(&prefix))
}

/// True unless the current branch tracks a non-AOSP remote.
fn on_aosp_branch() -> CliResult<bool> {
    let out = git(&["branch", "-vv"])?;
    Ok(out
        .lines()
        .find(|line| line.starts_with('*'))
        .is_none_or(|current| current.contains("[aosp/")))
}

fn diff_touches_xml_tag() -> CliResult<bool> {
    let out = git(&["show"])?;
    let tag = XML_TAG.to_ascii_lowercase();
    let changed = out.lines().find(|line| {
        (line.starts_with('+') || line.starts_with('-')) && line.to_ascii_lowercase().contains(&tag)
    });
    if let Some(line) = changed {
        debug!(line, "commit changes an xml tag");
    }
    Ok(changed.is_some())
}

fn git(args: &[&str]) -> CliResult<String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|err| io_error("git", err))?;
    if !output.status.success() {
        warn!(?args, status = %output.status, "git exited with an error");
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn print_check(out: &CheckOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            if out.skipped {
                println!("AOSP branch, nothing to check.");
                return;
            }
            if out.passed {
                println!("Commit message OK.");
                return;
            }
            for finding in out.findings {
                println!("This commit has changed: \"{}\".", finding.file);
                println!("  {}", finding.reason);
                println!("  Add a line starting with \"{}\", for example:", finding.required);
                for example in &finding.examples {
                    println!("    {example}");
                }
                println!();
            }
        }
    }
}
