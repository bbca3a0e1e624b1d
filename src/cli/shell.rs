//! Collaborators that touch the outside world: ssh and the user

use std::cell::OnceCell;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::exec::{Confirm, Executor};
use crate::core::item::Host;

/// Runs commands over `ssh <fqdn> -A -t`, attached to the terminal.
///
/// `ssh` is looked up on first use, so entries that never reach a host work
/// without it.
#[derive(Default)]
pub struct SshExecutor {
    ssh: OnceCell<PathBuf>,
}

impl SshExecutor {
    fn ssh(&self) -> Result<&PathBuf> {
        if let Some(ssh) = self.ssh.get() {
            return Ok(ssh);
        }
        let ssh = which::which("ssh").context("ssh not found in PATH")?;
        Ok(self.ssh.get_or_init(|| ssh))
    }
}

impl Executor for SshExecutor {
    fn run(&self, command: Option<&str>, host: &Host) -> Result<ExitStatus> {
        let mut cmd = Command::new(self.ssh()?);
        cmd.arg(&host.fqdn).arg("-A").arg("-t");
        if let Some(command) = command {
            cmd.arg(command);
        }

        debug!("Running {:?}", cmd);
        cmd.status()
            .with_context(|| format!("ssh to {} failed", host.fqdn))
    }
}

/// Asks on the terminal; anything but an explicit yes is a no
pub struct DialoguerConfirm;

impl Confirm for DialoguerConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let answer = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact_opt()
            .context("Failed to read confirmation")?;
        Ok(answer.unwrap_or(false))
    }
}

/// Answers yes without asking (`--yes`)
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}
