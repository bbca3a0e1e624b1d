//! Exec - What happens when an item is invoked
//!
//! Items decide *what* to do with their arguments; the side effects are left
//! to collaborators passed in through [`ExecContext`]:
//!
//! - [`Executor`] runs a command on (or opens a session to) a host
//! - [`Confirm`] asks the user before anything is run
//! - [`Presenter`] puts text on the screen
//!
//! Nothing here exits the process. A declined confirmation comes back as
//! [`Outcome::Cancelled`] and the caller decides what that means.

use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::error::ResolveError;
use super::item::{CommandItem, Host, HostItem, Info, Item, ItemKind};
use super::project::CommandNode;
use super::repo::Repo;

/// Runs commands on hosts
pub trait Executor {
    /// Run `command` on `host`, or open an interactive session when `command`
    /// is `None`.
    fn run(&self, command: Option<&str>, host: &Host) -> anyhow::Result<ExitStatus>;
}

/// Yes/no questions
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool>;
}

/// Brings a repository checkout up to date
pub trait SourceUpdater {
    fn sync(&self, path: &Path) -> anyhow::Result<()>;
}

/// Output produced while executing
pub trait Presenter {
    /// Children of a repository, in projection order
    fn children(&mut self, node: &CommandNode) -> io::Result<()>;

    /// Body of an info item
    fn info(&mut self, item: &Item, info: &Info) -> io::Result<()>;

    /// Host aliases a command can target
    fn targets(&mut self, item: &Item, command: &CommandItem) -> io::Result<()>;

    /// What is about to run, shown before confirmation
    fn plan(&mut self, item: &Item, command: &str, definition: &str, host: &Host) -> io::Result<()>;

    /// Categories and hosts of a host item
    fn hosts(&mut self, item: &Item, hosts: &HostItem) -> io::Result<()>;
}

/// Collaborators for one execution
pub struct ExecContext<'a> {
    pub executor: &'a dyn Executor,
    pub confirm: &'a dyn Confirm,
    pub presenter: &'a mut dyn Presenter,
}

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Something was printed
    Listed,
    /// A command or session ran on a host
    Ran(ExitStatus),
    /// The user declined to continue
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ExecError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

const CONFIRM_PROMPT: &str = "Do you want to continue?";

impl Item {
    /// Execute this item with the arguments left over after resolution.
    ///
    /// `repo` is the repository holding the item; command items look up their
    /// hosts from its root.
    ///
    /// # Errors
    /// Resolution failures for host arguments, output failures, and whatever
    /// the executor or confirmation report.
    pub fn execute<S: AsRef<str>>(
        &self,
        repo: &Arc<Repo>,
        args: &[S],
        ctx: &mut ExecContext<'_>,
    ) -> Result<Outcome, ExecError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        debug!("Executing {} with {:?}", self, args);

        match self.kind() {
            ItemKind::Info(info) => {
                ctx.presenter.info(self, info)?;
                Ok(Outcome::Listed)
            }
            ItemKind::Command(command) => self.execute_command(command, repo, &args, ctx),
            ItemKind::Host(hosts) => self.execute_host(hosts, &args, ctx),
        }
    }

    fn execute_command(
        &self,
        command: &CommandItem,
        repo: &Arc<Repo>,
        args: &[&str],
        ctx: &mut ExecContext<'_>,
    ) -> Result<Outcome, ExecError> {
        let Some((alias, extra)) = args.split_first() else {
            ctx.presenter.targets(self, command)?;
            return Ok(Outcome::Listed);
        };

        let definition = command.target(alias)?;
        let host = repo.root().get_host(definition)?;

        let line = if extra.is_empty() {
            command.command.clone()
        } else {
            format!("{} {}", command.command, extra.join(" "))
        };

        ctx.presenter.plan(self, &line, definition, &host)?;
        if !ctx.confirm.confirm(CONFIRM_PROMPT)? {
            return Ok(Outcome::Cancelled);
        }

        let status = ctx.executor.run(Some(&line), &host)?;
        Ok(Outcome::Ran(status))
    }

    fn execute_host(
        &self,
        hosts: &HostItem,
        args: &[&str],
        ctx: &mut ExecContext<'_>,
    ) -> Result<Outcome, ExecError> {
        let (host, remote) = match args {
            [] => {
                ctx.presenter.hosts(self, hosts)?;
                return Ok(Outcome::Listed);
            }
            [category] => (hosts.select(category, None)?, &[][..]),
            [category, index, remote @ ..] => (hosts.select(category, Some(*index))?, remote),
        };

        let remote = (!remote.is_empty()).then(|| remote.join(" "));
        let status = ctx.executor.run(remote.as_deref(), host)?;
        Ok(Outcome::Ran(status))
    }
}
