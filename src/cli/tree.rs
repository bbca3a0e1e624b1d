//! `saga tree` command
//!
//! Show the command hierarchy of the loaded repositories.
//!
//! # Usage
//! ```bash
//! saga tree                       # Every repository
//! saga tree ops deploy            # Subtree
//! saga tree --depth 1             # Limit depth
//! saga tree ops --format json     # Machine-readable
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::cli::render::render_tree;
use crate::config::Config;
use crate::core::error::ResolveError;
use crate::core::project::{project, CommandNode};
use crate::core::repo::{load_repos, Repo};

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum TreeFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Repository, then names below it (default: everything)
    pub path: Vec<String>,

    /// Maximum depth
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: TreeFormat,
}

pub async fn run(args: TreeArgs, config: &Config) -> Result<()> {
    let repos = load_repos(&config.repositories, &config.build_options()).await;
    print!("{}", tree(&args, &repos)?);
    Ok(())
}

fn tree(args: &TreeArgs, repos: &BTreeMap<String, Arc<Repo>>) -> Result<String> {
    let nodes = select(&args.path, repos)?;

    let out = match args.format {
        TreeFormat::Json => {
            let mut json = match nodes.as_slice() {
                [node] => serde_json::to_string_pretty(node)?,
                _ => serde_json::to_string_pretty(&nodes)?,
            };
            json.push('\n');
            json
        }
        TreeFormat::Pretty => nodes
            .iter()
            .map(|node| render_tree(node, args.depth))
            .collect(),
    };
    Ok(out)
}

fn select(path: &[String], repos: &BTreeMap<String, Arc<Repo>>) -> Result<Vec<CommandNode>> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(repos.values().map(project).collect());
    };

    let repo = super::find_repo(repos, first).ok_or_else(|| ResolveError::NotFound {
        token: first.clone(),
    })?;
    let root = project(repo);

    let mut node = &root;
    for name in rest {
        node = node.child(name).ok_or_else(|| ResolveError::NotFound {
            token: name.clone(),
        })?;
    }
    Ok(vec![node.clone()])
}
