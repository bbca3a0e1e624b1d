//! `saga update` and `saga clone` commands
//!
//! Keep repository checkouts in sync with their git remotes.
//!
//! # Usage
//! ```bash
//! saga update                                   # git pull in every repository
//! saga clone git@github.com:me/saga-ops.git     # clone as `ops`, add to config
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::exec::SourceUpdater;
use crate::core::repo::load_repos;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Only update these repositories (by key)
    pub repos: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Git URL of the repository
    pub url: String,

    /// Directory name under repo_root (default: derived from the URL)
    #[arg(long)]
    pub name: Option<String>,
}

/// Runs `git` in repository checkouts
pub struct GitUpdater {
    git: PathBuf,
}

impl GitUpdater {
    pub fn new() -> Result<Self> {
        let git = which::which("git").context("git not found in PATH")?;
        Ok(Self { git })
    }

    /// `git clone <url> <dest>`
    pub fn clone_into(&self, url: &str, dest: &Path) -> Result<()> {
        let status = Command::new(&self.git)
            .arg("clone")
            .arg(url)
            .arg(dest)
            .status()
            .context("Failed to run git clone")?;
        if !status.success() {
            bail!("git clone {} failed ({})", url, status);
        }
        Ok(())
    }
}

impl SourceUpdater for GitUpdater {
    fn sync(&self, path: &Path) -> Result<()> {
        let status = Command::new(&self.git)
            .arg("pull")
            .current_dir(path)
            .status()
            .with_context(|| format!("Failed to run git pull in {}", path.display()))?;
        if !status.success() {
            bail!("git pull in {} failed ({})", path.display(), status);
        }
        Ok(())
    }
}

pub async fn run_update(args: UpdateArgs, config: &Config) -> Result<()> {
    let updater = GitUpdater::new()?;
    update(&args, config, &updater).await
}

async fn update(args: &UpdateArgs, config: &Config, updater: &dyn SourceUpdater) -> Result<()> {
    let repos = load_repos(&config.repositories, &config.build_options()).await;

    for wanted in &args.repos {
        if !repos.contains_key(wanted) {
            bail!("No such repository: {}", wanted);
        }
    }

    let mut failed = Vec::new();
    for (key, repo) in &repos {
        if !args.repos.is_empty() && !args.repos.contains(key) {
            continue;
        }

        info!("Updating {}...", key);
        if let Err(e) = updater.sync(repo.path()) {
            warn!("{:#}", e);
            failed.push(key.as_str());
        }
    }

    if !failed.is_empty() {
        bail!("Failed to update: {}", failed.join(", "));
    }
    Ok(())
}

pub fn run_clone(args: CloneArgs, config: &mut Config, config_path: &Path) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => clone_name(&args.url)?,
    };
    let dest = config.repo_root()?.join(&name);
    if dest.exists() {
        bail!("{} already exists", dest.display());
    }

    GitUpdater::new()?.clone_into(&args.url, &dest)?;
    config.add_repo(config_path, &dest)?;

    println!("Added {} as {}", args.url, name);
    Ok(())
}

/// Directory name for a cloned repository: the trailing word of the URL.
///
/// `saga-topic`, `kb-topic` and `topic` all become `topic`.
pub fn clone_name(url: &str) -> Result<String> {
    let base = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(url);
    let base = base.strip_suffix(".git").unwrap_or(base);
    let name = base.rsplit('-').next().unwrap_or(base);

    if name.is_empty() {
        bail!("Cannot derive a repository name from '{}', pass --name", url);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repo::tests::{info, write};
    use std::cell::RefCell;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingUpdater {
        synced: RefCell<Vec<PathBuf>>,
        fail_on: Option<PathBuf>,
    }

    impl SourceUpdater for RecordingUpdater {
        fn sync(&self, path: &Path) -> Result<()> {
            if self.fail_on.as_deref() == Some(path) {
                bail!("boom");
            }
            self.synced.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_clone_name() {
        assert_eq!(clone_name("git@github.com:me/saga-ops.git").unwrap(), "ops");
        assert_eq!(clone_name("https://example.com/kb-team-infra").unwrap(), "infra");
        assert_eq!(clone_name("https://example.com/notes/").unwrap(), "notes");
        assert!(clone_name("https://example.com/saga-").is_err());
    }

    fn config_with(root: &Path) -> Config {
        let mut config = Config::default();
        for name in ["alpha", "beta"] {
            write(root, &format!("{name}/_repo.yaml"), "summary: x\n");
            write(root, &format!("{name}/doc.yaml"), &info("doc"));
            config.repositories.push(root.join(name));
        }
        config
    }

    #[tokio::test]
    async fn test_update_syncs_every_repo() {
        let dir = tempdir().unwrap();
        let config = config_with(dir.path());
        let updater = RecordingUpdater::default();

        update(&UpdateArgs { repos: vec![] }, &config, &updater)
            .await
            .unwrap();

        let synced = updater.synced.borrow();
        assert_eq!(synced.len(), 2);
        assert!(synced[0].ends_with("alpha"));
        assert!(synced[1].ends_with("beta"));
    }

    #[tokio::test]
    async fn test_update_selected_and_unknown() {
        let dir = tempdir().unwrap();
        let config = config_with(dir.path());
        let updater = RecordingUpdater::default();

        let args = UpdateArgs {
            repos: vec!["beta".to_string()],
        };
        update(&args, &config, &updater).await.unwrap();
        assert_eq!(updater.synced.borrow().len(), 1);

        let args = UpdateArgs {
            repos: vec!["gamma".to_string()],
        };
        assert!(update(&args, &config, &updater).await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_going_after_failure() {
        let dir = tempdir().unwrap();
        let config = config_with(dir.path());
        let updater = RecordingUpdater {
            fail_on: Some(dir.path().join("alpha").canonicalize().unwrap()),
            ..Default::default()
        };

        let err = update(&UpdateArgs { repos: vec![] }, &config, &updater)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("alpha"));
        assert_eq!(updater.synced.borrow().len(), 1);
    }
}
