//! CLI module - Command definitions and handlers
//!
//! Built-in commands are declared with clap derive. Anything else is taken
//! as a repository key (or alias) and handed to the repository's own command
//! hierarchy, built at runtime by [`hierarchy`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::config::{Config, CONFIG_ENV};
use crate::core::error::ResolveError;
use crate::core::exec::{Confirm, ExecContext, Outcome, Presenter};
use crate::core::project::{project, Action, CommandNode, NodeKind};
use crate::core::repo::{load_repos, Repo};

pub mod config;
pub mod hierarchy;
pub mod render;
pub mod shell;
pub mod tree;
pub mod update;

use render::TermPresenter;
use shell::{AssumeYes, DialoguerConfirm, SshExecutor};

/// saga - spread and use knowledge
///
/// Notes, commands and host groups from a tree of YAML repositories.
#[derive(Parser, Debug)]
#[command(name = "saga")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Run commands without asking for confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the command hierarchy
    Tree(tree::TreeArgs),

    /// Pull the latest changes into the repositories
    Update(update::UpdateArgs),

    /// Clone a repository and add it to the config
    Clone(update::CloneArgs),

    /// Get or set configuration
    Config(config::ConfigArgs),

    /// A repository, followed by entries inside it
    #[command(external_subcommand)]
    Repo(Vec<String>),
}

/// Names that never reach a repository
pub const BUILTINS: &[&str] = &["tree", "update", "clone", "config", "help"];

impl Cli {
    /// Config file in use: `--config`, `SAGACITY_CONFIG`, or the platform default
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_path().context("Cannot determine config directory"),
        }
    }
}

/// Repository by key, then by alias
pub fn find_repo<'a>(repos: &'a BTreeMap<String, Arc<Repo>>, name: &str) -> Option<&'a Arc<Repo>> {
    repos
        .get(name)
        .or_else(|| repos.values().find(|r| r.alias() == Some(name)))
}

async fn load(config: &Config) -> BTreeMap<String, Arc<Repo>> {
    let repos = load_repos(&config.repositories, &config.build_options()).await;
    for key in repos.keys() {
        if BUILTINS.contains(&key.as_str()) {
            warn!("Repository '{}' is shadowed by the built-in command", key);
        }
    }
    debug!("Loaded {} repositories", repos.len());
    repos
}

/// `saga` without arguments: the loaded repositories, sorted
pub async fn run_list(config: &Config) -> Result<Outcome> {
    let repos = load(config).await;
    let node = CommandNode {
        name: "saga".to_string(),
        about: String::new(),
        alias: None,
        kind: NodeKind::Repo,
        action: Action::List,
        subcommands: repos.values().map(project).collect(),
    };

    let mut presenter = TermPresenter::stdout(config.display.wrap_width);
    presenter.children(&node)?;
    Ok(Outcome::Listed)
}

/// `saga <repo> [names..] [args..]`
pub async fn run_repo(tokens: Vec<String>, config: &Config, assume_yes: bool) -> Result<Outcome> {
    let repos = load(config).await;

    let Some(first) = tokens.first() else {
        return Ok(Outcome::Listed);
    };
    let repo = find_repo(&repos, first).ok_or_else(|| ResolveError::NotFound {
        token: first.clone(),
    })?;

    let node = project(repo);
    let matches = match hierarchy::to_clap(&node)
        .bin_name(format!("saga {}", first))
        .try_get_matches_from(&tokens)
    {
        Ok(matches) => matches,
        Err(e) => e.exit(),
    };

    let (path, args) = hierarchy::route(&matches);
    let target = node
        .find(&path)
        .with_context(|| format!("No entry at {}", path.join(" ")))?;

    let executor = SshExecutor::default();
    let confirm: &dyn Confirm = if assume_yes {
        &AssumeYes
    } else {
        &DialoguerConfirm
    };
    let mut presenter = TermPresenter::stdout(config.display.wrap_width);
    let mut ctx = ExecContext {
        executor: &executor,
        confirm,
        presenter: &mut presenter,
    };

    Ok(target.run(&args, &mut ctx)?)
}
