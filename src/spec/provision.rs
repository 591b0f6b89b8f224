//! Provisioning plan (provision.json): ordered idempotent host steps.
//!
//! JSON shape:
//! {
//!   "hosts": "testnet",
//!   "remote_user": "ubuntu",
//!   "become": true,
//!   "steps": [
//!     { "type": "apt-update" },
//!     { "type": "apt-install", "packages": ["docker-ce"] },
//!     { "type": "apt-key", "url": "https://example.com/gpg" },
//!     { "type": "apt-repository", "repo": "deb https://example.com/apt stable main" },
//!     { "type": "pip-install", "packages": ["docker-py"] },
//!     { "type": "group", "name": "docker" },
//!     { "type": "user-group", "user": "ubuntu", "group": "docker" },
//!     { "type": "service", "name": "docker" },
//!     { "type": "pause", "seconds": 30 },
//!     { "type": "wait-for", "command": "docker info", "retries": 10, "delay_secs": 3 }
//!   ]
//! }
//!
//! Steps are applied strictly in order; each one is an assertion about
//! host state that is safe to re-apply (idempotence is delegated to the
//! invoked tool). "pause" reproduces the fixed readiness delay of the
//! original sequence; "wait-for" is the poll-based alternative.

use crate::Result;
use anyhow::bail;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PlanSpec {
    #[serde(default = "default_hosts")]
    pub hosts: String,

    #[serde(default = "default_remote_user")]
    pub remote_user: String,

    /// Privilege escalation for every task in the play.
    #[serde(default = "default_true", rename = "become")]
    pub escalate: bool,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One idempotent host-state assertion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Step {
    /// Refresh the package index.
    AptUpdate,

    /// Ensure the named packages are installed.
    AptInstall { packages: Vec<String> },

    /// Trust an external package signing key.
    AptKey { url: String },

    /// Register an external package repository.
    AptRepository { repo: String },

    /// Ensure the named Python packages are installed.
    PipInstall { packages: Vec<String> },

    /// Ensure a system group exists.
    Group { name: String },

    /// Ensure a user belongs to a group.
    UserGroup { user: String, group: String },

    /// Ensure a system service is running.
    Service { name: String },

    /// Fixed delay (crude readiness substitute, kept for fidelity).
    Pause { seconds: u64 },

    /// Poll a command until it succeeds (readiness check).
    WaitFor {
        command: String,

        #[serde(default = "default_retries")]
        retries: u32,

        #[serde(default = "default_delay_secs")]
        delay_secs: u64,
    },
}

/// Validated plan, ready for rendering or sequential application.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub hosts: String,
    pub remote_user: String,
    pub escalate: bool,
    pub steps: Vec<Step>,
}

impl PlanSpec {
    /// Check step-level constraints and build a ValidatedPlan.
    pub fn validate_and_build(&self) -> Result<ValidatedPlan> {
        if self.steps.is_empty() {
            bail!("provisioning plan has no steps");
        }

        // User/group/service names share the conservative token syntax.
        let token_re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$")?;

        for (index, step) in self.steps.iter().enumerate() {
            step.validate(&token_re)
                .map_err(|e| e.context(format!("step {} ({})", index + 1, step.title())))?;
        }

        Ok(ValidatedPlan {
            hosts: self.hosts.clone(),
            remote_user: self.remote_user.clone(),
            escalate: self.escalate,
            steps: self.steps.clone(),
        })
    }
}

impl Step {
    /// Short human label, used for playbook task names and runner logs.
    /// Kept free of ':' and '"' so it can be emitted as a plain YAML scalar.
    pub fn title(&self) -> String {
        match self {
            Step::AptUpdate => "update apt package index".to_string(),
            Step::AptInstall { packages } => format!("install {}", packages.join(" ")),
            Step::AptKey { .. } => "trust package signing key".to_string(),
            Step::AptRepository { .. } => "register package repository".to_string(),
            Step::PipInstall { packages } => format!("pip install {}", packages.join(" ")),
            Step::Group { name } => format!("ensure group {}", name),
            Step::UserGroup { user, group } => format!("add {} to group {}", user, group),
            Step::Service { name } => format!("ensure service {} is running", name),
            Step::Pause { seconds } => format!("pause {}s for daemon readiness", seconds),
            Step::WaitFor { .. } => "wait for readiness probe".to_string(),
        }
    }

    fn validate(&self, token_re: &Regex) -> Result<()> {
        match self {
            Step::AptUpdate => {}
            Step::AptInstall { packages } | Step::PipInstall { packages } => {
                if packages.is_empty() {
                    bail!("package list cannot be empty");
                }
                for pkg in packages {
                    if !token_re.is_match(pkg) {
                        bail!("bad package name: {:?}", pkg);
                    }
                }
            }
            Step::AptKey { url } => {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    bail!("key url must be http(s): {:?}", url);
                }
                check_shell_safe(url)?;
            }
            Step::AptRepository { repo } => {
                if repo.trim().is_empty() {
                    bail!("repository line cannot be empty");
                }
                check_shell_safe(repo)?;
            }
            Step::Group { name } | Step::Service { name } => {
                if !token_re.is_match(name) {
                    bail!("bad name: {:?}", name);
                }
            }
            Step::UserGroup { user, group } => {
                if !token_re.is_match(user) {
                    bail!("bad user name: {:?}", user);
                }
                if !token_re.is_match(group) {
                    bail!("bad group name: {:?}", group);
                }
            }
            Step::Pause { seconds } => {
                if *seconds == 0 {
                    bail!("pause must be at least one second");
                }
            }
            Step::WaitFor { command, retries, .. } => {
                if command.trim().is_empty() {
                    bail!("probe command cannot be empty");
                }
                check_shell_safe(command)?;
                if *retries == 0 {
                    bail!("retries must be at least 1");
                }
            }
        }
        Ok(())
    }
}

// Values end up single-quoted inside `sh -c` lines and double-quoted in
// the rendered playbook, so both quote kinds are rejected up front.
fn check_shell_safe(value: &str) -> Result<()> {
    if value.contains('\'') || value.contains('"') || value.contains('\n') {
        bail!("value cannot contain quotes or newlines: {:?}", value);
    }
    Ok(())
}

// Default value functions

fn default_hosts() -> String {
    "all".to_string()
}

fn default_remote_user() -> String {
    "root".to_string()
}

fn default_true() -> bool {
    true
}

fn default_retries() -> u32 {
    10
}

fn default_delay_secs() -> u64 {
    3
}
