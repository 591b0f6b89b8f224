//! Sequential application of provisioning steps on the local host.
//!
//! Each step maps to one fixed command line; idempotence is delegated to
//! the invoked tool (apt-get, groupadd -f, usermod -aG, ...). Steps run
//! strictly in order and the first failure aborts the run. There is no
//! guard against concurrent runs touching the same host.

use crate::Result;
use crate::spec::{Step, ValidatedPlan};
use anyhow::{Context, bail};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{info, warn};

pub struct StepRunner {
    dry_run: bool,
}

impl StepRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Apply every step of the plan, in order.
    pub fn apply(&self, plan: &ValidatedPlan) -> Result<()> {
        info!(hosts = %plan.hosts, steps = plan.steps.len(), "applying provisioning plan");

        for (index, step) in plan.steps.iter().enumerate() {
            info!(step = index + 1, "{}", step.title());
            match step {
                Step::WaitFor {
                    command,
                    retries,
                    delay_secs,
                } => self.wait_for(command, *retries, *delay_secs)?,
                other => self
                    .shell(&command_for(other))
                    .with_context(|| step.title())?,
            }
        }

        info!("provisioning plan applied");
        Ok(())
    }

    fn shell(&self, command: &str) -> Result<()> {
        if self.dry_run {
            println!("[dry-run] {}", command);
            return Ok(());
        }

        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to spawn: {}", command))?;

        if !status.success() {
            bail!("command exited with {}: {}", status, command);
        }
        Ok(())
    }

    /// Poll the probe command until it succeeds, up to `retries` attempts.
    fn wait_for(&self, command: &str, retries: u32, delay_secs: u64) -> Result<()> {
        if self.dry_run {
            println!("[dry-run] poll until success ({}x): {}", retries, command);
            return Ok(());
        }

        for attempt in 1..=retries {
            let status = Command::new("sh")
                .arg("-c")
                .arg(command)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .with_context(|| format!("failed to spawn probe: {}", command))?;

            if status.success() {
                return Ok(());
            }

            if attempt < retries {
                warn!(attempt, "probe failed, retrying in {}s", delay_secs);
                std::thread::sleep(Duration::from_secs(delay_secs));
            }
        }

        bail!("probe did not succeed after {} attempts: {}", retries, command)
    }
}

/// Fixed command line for a step. Pure: the same step always maps to the
/// same command, so re-running a plan issues the identical assertion
/// sequence.
pub fn command_for(step: &Step) -> String {
    match step {
        Step::AptUpdate => "apt-get update".to_string(),
        Step::AptInstall { packages } => {
            format!("apt-get install -y {}", packages.join(" "))
        }
        Step::AptKey { url } => format!("curl -fsSL '{}' | apt-key add -", url),
        Step::AptRepository { repo } => format!("add-apt-repository -y '{}'", repo),
        Step::PipInstall { packages } => format!("pip install {}", packages.join(" ")),
        Step::Group { name } => format!("groupadd -f {}", name),
        Step::UserGroup { user, group } => format!("usermod -aG {} {}", group, user),
        Step::Service { name } => format!(
            "service {} status >/dev/null 2>&1 || service {} start",
            name, name
        ),
        Step::Pause { seconds } => format!("sleep {}", seconds),
        Step::WaitFor { command, .. } => command.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn steps_map_to_fixed_commands() {
        assert_eq!(command_for(&Step::AptUpdate), "apt-get update");
        assert_eq!(
            command_for(&Step::AptInstall {
                packages: vec!["docker-ce".into(), "curl".into()]
            }),
            "apt-get install -y docker-ce curl"
        );
        assert_eq!(
            command_for(&Step::AptKey {
                url: "https://example.com/gpg".into()
            }),
            "curl -fsSL 'https://example.com/gpg' | apt-key add -"
        );
        assert_eq!(
            command_for(&Step::UserGroup {
                user: "ubuntu".into(),
                group: "docker".into()
            }),
            "usermod -aG docker ubuntu"
        );
        assert_eq!(command_for(&Step::Group { name: "docker".into() }), "groupadd -f docker");
        assert_eq!(command_for(&Step::Pause { seconds: 30 }), "sleep 30");
    }

    #[test]
    fn command_mapping_is_pure() {
        let step = Step::Service { name: "docker".into() };
        assert_eq!(command_for(&step), command_for(&step));
    }

    #[test]
    fn shell_reports_a_failing_command() {
        let runner = StepRunner::new(false);
        assert!(runner.shell("true").is_ok());
        assert!(runner.shell("false").is_err());
    }

    #[test]
    fn dry_run_executes_nothing() {
        let runner = StepRunner::new(true);
        // Would fail if actually spawned.
        assert!(runner.shell("false").is_ok());
        assert!(runner.wait_for("false", 3, 1).is_ok());
    }

    #[test]
    fn wait_for_succeeds_on_a_passing_probe() {
        let runner = StepRunner::new(false);
        assert!(runner.wait_for("true", 1, 0).is_ok());
    }

    #[test]
    fn wait_for_gives_up_after_retries() {
        let runner = StepRunner::new(false);
        let err = runner.wait_for("false", 2, 0).unwrap_err();
        assert!(err.to_string().contains("2 attempts"), "got: {err}");
    }

    #[test]
    fn apply_runs_a_plan_in_order() {
        let plan = ValidatedPlan {
            hosts: "all".to_string(),
            remote_user: "root".to_string(),
            escalate: false,
            steps: vec![
                Step::WaitFor {
                    command: "true".to_string(),
                    retries: 1,
                    delay_secs: 0,
                },
                Step::Pause { seconds: 1 },
            ],
        };
        assert!(StepRunner::new(false).apply(&plan).is_ok());
    }
}
