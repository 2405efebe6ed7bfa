use std::path::Path;

use serde::Serialize;

use crate::config::Config;
use crate::error::ReelReplyError;
use reelreply_storage::seen_store::{inspect, StateFileStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    fn as_label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub id: String,
    pub title: String,
    pub status: CheckStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn push(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        status: CheckStatus,
        detail: impl Into<String>,
        fix: Option<String>,
    ) {
        self.checks.push(DoctorCheck {
            id: id.into(),
            title: title.into(),
            status,
            detail: detail.into(),
            fix,
        });
    }

    fn summary(&self) -> (usize, usize, usize) {
        let mut pass = 0usize;
        let mut warn = 0usize;
        let mut fail = 0usize;
        for check in &self.checks {
            match check.status {
                CheckStatus::Pass => pass += 1,
                CheckStatus::Warn => warn += 1,
                CheckStatus::Fail => fail += 1,
            }
        }
        (pass, warn, fail)
    }

    pub fn has_failures(&self) -> bool {
        self.summary().2 > 0
    }
}

/// Print the preflight report. Exits with status 2 when any check fails.
pub fn run_cli(json_output: bool) -> anyhow::Result<()> {
    let report = build_report(Config::load());
    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    if report.has_failures() {
        std::process::exit(2);
    }
    Ok(())
}

pub fn build_report(loaded: Result<Config, ReelReplyError>) -> DoctorReport {
    let mut report = DoctorReport::default();
    check_config_file(&mut report);
    match loaded {
        Ok(config) => {
            report.push(
                "config.secrets",
                "Credentials",
                CheckStatus::Pass,
                format!("all required variables set for {}", config.insta_username),
                None,
            );
            check_state_file(&mut report, Path::new(&config.state_path));
        }
        Err(err) => {
            report.push(
                "config.secrets",
                "Credentials",
                CheckStatus::Fail,
                err.to_string(),
                Some("Set the variables in the environment or a .env file.".to_string()),
            );
            check_state_file(&mut report, Path::new(&Config::default().state_path));
        }
    }
    report
}

fn check_config_file(report: &mut DoctorReport) {
    match Config::resolve_config_path() {
        Ok(Some(path)) => report.push(
            "config.file",
            "Config file",
            CheckStatus::Pass,
            format!("found {}", path.display()),
            None,
        ),
        Ok(None) => report.push(
            "config.file",
            "Config file",
            CheckStatus::Pass,
            "none, using built-in defaults",
            None,
        ),
        Err(err) => report.push(
            "config.file",
            "Config file",
            CheckStatus::Fail,
            err.to_string(),
            Some("Fix REELREPLY_CONFIG or create a valid config file.".to_string()),
        ),
    }
}

fn check_state_file(report: &mut DoctorReport, path: &Path) {
    match inspect(path) {
        Ok(StateFileStatus::Valid { entries }) => report.push(
            "state.file",
            "State file",
            CheckStatus::Pass,
            format!("{} ({entries} replied ids)", path.display()),
            None,
        ),
        Ok(StateFileStatus::Missing) => report.push(
            "state.file",
            "State file",
            CheckStatus::Warn,
            format!("{} not found, it will be created on start", path.display()),
            None,
        ),
        Ok(StateFileStatus::Corrupt { reason }) => report.push(
            "state.file",
            "State file",
            CheckStatus::Warn,
            format!("{} is unreadable ({reason})", path.display()),
            Some("It will be reset to an empty set on start.".to_string()),
        ),
        Err(err) => report.push(
            "state.file",
            "State file",
            CheckStatus::Fail,
            err.to_string(),
            Some("Check permissions or point state_path elsewhere.".to_string()),
        ),
    }
}

fn print_report(report: &DoctorReport) {
    println!("ReelReply Doctor");
    println!();
    for check in &report.checks {
        println!(
            "[{:<4}] {:<16} ({}) {}",
            check.status.as_label(),
            check.title,
            check.id,
            check.detail
        );
        if let Some(fix) = &check.fix {
            println!("        fix: {}", fix);
        }
    }
    let (pass, warn, fail) = report.summary();
    println!();
    println!("Summary: pass={} warn={} fail={}", pass, warn, fail);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("reelreply_doctor_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn only_check(report: &DoctorReport) -> &DoctorCheck {
        assert_eq!(report.checks.len(), 1);
        &report.checks[0]
    }

    #[test]
    fn test_state_file_missing_is_warning() {
        let dir = temp_dir();
        let mut report = DoctorReport::default();
        check_state_file(&mut report, &dir.join("store.json"));
        assert_eq!(only_check(&report).status, CheckStatus::Warn);
        assert!(!dir.join("store.json").exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_state_file_valid_reports_entries() {
        let dir = temp_dir();
        let path = dir.join("store.json");
        std::fs::write(&path, r#"{"replied_to":["a","b"]}"#).unwrap();
        let mut report = DoctorReport::default();
        check_state_file(&mut report, &path);
        let check = only_check(&report);
        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.detail.contains("2 replied ids"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_state_file_corrupt_is_warning_and_untouched() {
        let dir = temp_dir();
        let path = dir.join("store.json");
        std::fs::write(&path, "not json").unwrap();
        let mut report = DoctorReport::default();
        check_state_file(&mut report, &path);
        let check = only_check(&report);
        assert_eq!(check.status, CheckStatus::Warn);
        assert!(check.fix.is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_build_report_flags_missing_secrets() {
        let _guard = crate::test_support::env_lock();
        let loaded = Err(ReelReplyError::Config(
            "Missing required environment variables: APIFY_KEY".into(),
        ));
        let report = build_report(loaded);
        let secrets = report
            .checks
            .iter()
            .find(|c| c.id == "config.secrets")
            .unwrap();
        assert_eq!(secrets.status, CheckStatus::Fail);
        assert!(secrets.detail.contains("APIFY_KEY"));
        assert!(report.has_failures());
    }

    #[test]
    fn test_report_json_shape() {
        let dir = temp_dir();
        let mut report = DoctorReport::default();
        check_state_file(&mut report, &dir.join("store.json"));
        report.push("config.secrets", "Credentials", CheckStatus::Pass, "ok", None);

        let value = serde_json::to_value(&report).unwrap();
        let checks = value["checks"].as_array().unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0]["id"], "state.file");
        assert_eq!(checks[0]["status"], "warn");
        assert_eq!(checks[1]["status"], "pass");
        assert!(checks[1].get("fix").is_none());
        let _ = std::fs::remove_dir_all(dir);
    }
}
