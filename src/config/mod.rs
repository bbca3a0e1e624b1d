//! Configuration module
//!
//! ```toml
//! repo_root = "/home/me/.local/share/sagacity"
//! repositories = ["/home/me/kb/ops", "/home/me/kb/team"]
//!
//! [build]
//! extensions = ["yaml", "yml"]
//! subrepo_marker = "_repo.yaml"
//! max_concurrent_reads = 64
//!
//! [display]
//! wrap_width = 80
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use toml_edit::{Array, DocumentMut, Item as TomlItem};

use crate::core::repo::BuildOptions;

/// Environment variable pointing at the config file
pub const CONFIG_ENV: &str = "SAGACITY_CONFIG";

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where `clone` puts new repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<PathBuf>,

    /// Repositories loaded at start-up
    #[serde(default)]
    pub repositories: Vec<PathBuf>,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subrepo_marker: Option<String>,

    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            subrepo_marker: None,
            max_concurrent_reads: default_max_concurrent_reads(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string()]
}

fn default_max_concurrent_reads() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            wrap_width: default_wrap_width(),
        }
    }
}

fn default_wrap_width() -> usize {
    80
}

impl Config {
    /// Load config from a specific file. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Platform config file (`~/.config/sagacity/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Directory new repositories are cloned into
    pub fn repo_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.repo_root {
            return Ok(root.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .context("No repo_root configured and no home directory to default to")
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            extensions: self.build.extensions.clone(),
            subrepo_marker: self.build.subrepo_marker.clone(),
            max_concurrent_reads: self.build.max_concurrent_reads,
        }
    }

    /// Register a repository and persist it to `path`.
    ///
    /// The file is edited in place, so comments and formatting survive.
    /// Adding a repository that is already listed is a no-op.
    pub fn add_repo(&mut self, path: &Path, repo: &Path) -> Result<()> {
        if self.repositories.iter().any(|r| r == repo) {
            return Ok(());
        }

        let content = if path.exists() {
            fs::read_to_string(path)?
        } else {
            String::new()
        };
        let mut doc: DocumentMut = content.parse().context("Failed to parse config.toml")?;

        let entry = doc
            .entry("repositories")
            .or_insert(TomlItem::Value(Array::new().into()));
        let list = entry
            .as_array_mut()
            .context("'repositories' in config.toml is not a list")?;
        list.push(repo.to_string_lossy().into_owned());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, doc.to_string())?;

        self.repositories.push(repo.to_path_buf());
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "sagacity")
}
