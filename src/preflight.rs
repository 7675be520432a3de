//! Preflight checks run before any download or extraction.
//!
//! Validates that the host tools the extractor shells out to are installed
//! and that the repository directory is usable. Checks never modify the
//! filesystem.

use std::path::Path;

use crate::process;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - provisioning will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
}

impl CheckResult {
    pub fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }

    /// `WARN:` line for a failed or warning check, `None` for a pass.
    pub fn diagnostic(&self) -> Option<String> {
        let status = match self.status {
            CheckStatus::Pass => return None,
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
        };
        Some(match &self.details {
            Some(details) => format!("WARN: [{}] {}: {}", status, self.name, details),
            None => format!("WARN: [{}] {}", status, self.name),
        })
    }
}

/// Results of all preflight checks.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    /// Names of the failed checks, comma separated.
    pub fn failed_names(&self) -> String {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Print one line to stderr per check that did not plainly pass.
    pub fn print(&self) {
        for check in &self.checks {
            match check.diagnostic() {
                Some(line) => eprintln!("{line}"),
                None => log::debug!("preflight {}: {:?}", check.name, check.details),
            }
        }
    }
}

/// Check host tools are installed.
pub fn check_host_tools(tools: &[&str]) -> Vec<CheckResult> {
    tools
        .iter()
        .map(|tool| match process::which(tool) {
            Some(path) => CheckResult::pass_with(tool, &path),
            None => CheckResult::fail(
                tool,
                &format!("Not found. Install '{}' package. Required to extract the BSP", tool),
            ),
        })
        .collect()
}

/// Check the repository directory.
pub fn check_repo_dir(repo_dir: &Path) -> CheckResult {
    match std::fs::metadata(repo_dir) {
        Ok(meta) if meta.is_dir() => {
            CheckResult::pass_with("repository", &repo_dir.display().to_string())
        }
        Ok(_) => CheckResult::fail(
            "repository",
            &format!("{} is not a directory", repo_dir.display()),
        ),
        Err(_) => CheckResult::warn(
            "repository",
            &format!("{} does not exist and will be created", repo_dir.display()),
        ),
    }
}

/// Run all preflight checks.
pub fn run_preflight(tools: &[&str], repo_dir: &Path) -> PreflightReport {
    let mut checks = check_host_tools(tools);
    checks.push(check_repo_dir(repo_dir));
    PreflightReport { checks }
}
