//! Thin wrapper over `docker compose` for the rendered harness file.
//!
//! Start order is whatever depends_on gives us: a start hint, not a
//! readiness guarantee.

use crate::Result;
use anyhow::{Context, bail};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::info;

#[derive(Debug)]
pub struct ComposeDriver {
    file: PathBuf,
}

impl ComposeDriver {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Start the harness in the background.
    pub fn up(&self) -> Result<()> {
        info!(file = %self.file.display(), "starting harness");
        self.exec(&["up", "-d"])
    }

    /// Stop the harness; optionally remove its volumes too.
    pub fn down(&self, volumes: bool) -> Result<()> {
        info!(file = %self.file.display(), "stopping harness");
        let mut args = vec!["down"];
        if volumes {
            args.push("-v");
        }
        self.exec(&args)
    }

    /// Follow logs for one service, or all of them.
    pub fn logs(&self, service: Option<&str>) -> Result<()> {
        let mut args = vec!["logs", "-f"];
        if let Some(service) = service {
            args.push(service);
        }
        self.exec(&args)
    }

    /// Run a one-off command in a service container (demo scripts).
    pub fn run(&self, service: &str, command: &[String]) -> Result<()> {
        let mut args = vec!["run", "--rm", service];
        args.extend(command.iter().map(String::as_str));
        self.exec(&args)
    }

    fn exec(&self, args: &[&str]) -> Result<()> {
        if !self.file.exists() {
            bail!(
                "compose file not found: {} (render the harness first)",
                self.file.display()
            );
        }

        let status = Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(&self.file)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .context("failed to execute docker; is it installed and on PATH?")?;

        if !status.success() {
            bail!(
                "docker compose {} exited with {}",
                args.first().unwrap_or(&""),
                status
            );
        }

        Ok(())
    }
}
