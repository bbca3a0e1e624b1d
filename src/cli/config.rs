//! `saga config` command
//!
//! Get or set configuration values.
//!
//! # Usage
//! ```bash
//! saga config                          # Show the config file
//! saga config display.wrap_width       # Get a value
//! saga config display.wrap_width 100   # Set a value
//! saga config --path                   # Where the config lives
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use toml_edit::{value, DocumentMut};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config key (e.g., repo_root, build.max_concurrent_reads)
    pub key: Option<String>,

    /// Value to set
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,
}

pub fn run(args: ConfigArgs, config_path: &Path) -> Result<()> {
    if args.path {
        println!("{}", config_path.display());
        return Ok(());
    }

    let Some(key) = &args.key else {
        if config_path.exists() {
            print!("{}", fs::read_to_string(config_path)?);
        } else {
            println!("No config file at {}", config_path.display());
        }
        return Ok(());
    };

    match &args.value {
        Some(val) => {
            set_config_value(config_path, key, val)?;
            println!("Set {} = {} (in {})", key, val, config_path.display());
        }
        None => match get_config_value(config_path, key)? {
            Some(v) => println!("{}", v),
            None => println!("(not set)"),
        },
    }

    Ok(())
}

/// Set a config value using dot notation (e.g., "display.wrap_width")
fn set_config_value(path: &Path, key: &str, val: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };
    let mut doc: DocumentMut = content.parse().context("Failed to parse config.toml")?;

    match key.split('.').collect::<Vec<_>>().as_slice() {
        [name] => doc[*name] = value(parse_toml_value(val)),
        [section, name] => {
            if doc.get(section).is_none() {
                doc[*section] = toml_edit::table();
            }
            doc[*section][*name] = value(parse_toml_value(val));
        }
        _ => bail!("Key too deep: {}. Max depth is section.key", key),
    }

    // refuse to write something the loader would reject
    toml::from_str::<crate::config::Config>(&doc.to_string())
        .with_context(|| format!("Invalid value for {}: {}", key, val))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, doc.to_string())?;
    Ok(())
}

/// Get a config value by dot notation key
fn get_config_value(path: &Path, key: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let doc: toml::Table = content.parse().context("Failed to parse config.toml")?;

    let val = match key.split('.').collect::<Vec<_>>().as_slice() {
        [name] => doc.get(*name),
        [section, name] => doc.get(*section).and_then(|t| t.get(*name)),
        _ => None,
    };

    Ok(val.map(|v| match v {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }))
}

/// Parse string value to appropriate TOML type
fn parse_toml_value(s: &str) -> toml_edit::Value {
    match s {
        "true" => true.into(),
        "false" => false.into(),
        _ => s
            .parse::<i64>()
            .map(toml_edit::Value::from)
            .unwrap_or_else(|_| s.into()),
    }
}
