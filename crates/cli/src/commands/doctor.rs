use std::fs;
use std::path::Path;

use hrdesk_core::config::{AppConfig, LoadOptions};
use hrdesk_core::domain::policy::PolicySource;
use hrdesk_db::repositories::EmployeeRepository;
use serde::Serialize;

use crate::bootstrap::open_employee_store;
use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<&Path>, json_output: bool) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::report(exit_code, output);
    }

    CommandResult::report(exit_code, render_human(&report))
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let options = LoadOptions { config_path: config_path.map(Path::to_path_buf), ..LoadOptions::default() };
    let checks = match AppConfig::load(options) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            check_credential_store(&config),
            check_policy_source(&config),
            check_memory_directory(&config.memory.directory),
        ],
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skipped("credential_store"),
            DoctorCheck::skipped("policy_source"),
            DoctorCheck::skipped("memory_directory"),
        ],
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credential_store(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "credential_store",
                format!("failed to initialize async runtime: {error}"),
            )
        }
    };

    let result = runtime.block_on(async {
        let repository = open_employee_store(&config.database).await?;
        let count = repository.count().await?;
        repository.pool().close().await;
        Ok::<u64, anyhow::Error>(count)
    });

    match result {
        Ok(0) => DoctorCheck::fail(
            "credential_store",
            format!("connected using `{}` but no employees are registered", config.database.url),
        ),
        Ok(count) => DoctorCheck::pass(
            "credential_store",
            format!("connected using `{}` ({count} employees)", config.database.url),
        ),
        Err(error) => DoctorCheck::fail("credential_store", format!("{error:#}")),
    }
}

fn check_policy_source(config: &AppConfig) -> DoctorCheck {
    let source = PolicySource::from_path(config.policies.path.as_deref());
    match source.load() {
        Ok(catalog) if catalog.is_empty() => DoctorCheck::fail(
            "policy_source",
            format!("{} contains no `topic: description` lines", source.describe()),
        ),
        Ok(catalog) => DoctorCheck::pass(
            "policy_source",
            format!("{} with {} topics", source.describe(), catalog.len()),
        ),
        Err(error) => DoctorCheck::fail("policy_source", error.to_string()),
    }
}

fn check_memory_directory(directory: &Path) -> DoctorCheck {
    match fs::metadata(directory) {
        Ok(metadata) if !metadata.is_dir() => DoctorCheck::fail(
            "memory_directory",
            format!("`{}` is not a directory", directory.display()),
        ),
        Ok(metadata) if metadata.permissions().readonly() => DoctorCheck::fail(
            "memory_directory",
            format!("`{}` is read-only", directory.display()),
        ),
        Ok(_) => DoctorCheck::pass(
            "memory_directory",
            format!("transcripts stored in `{}`", directory.display()),
        ),
        Err(_) => DoctorCheck::pass(
            "memory_directory",
            format!("`{}` will be created on first write", directory.display()),
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
