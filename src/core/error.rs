//! Error types for the core
//!
//! Two families, matching the two phases of a run:
//! - [`LoadError`] while the tree is being built from disk. Everything except
//!   `RootUnreadable` is contained to the document or directory that caused it.
//! - [`ResolveError`] while walking the finished tree. Always handed back to the
//!   caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while building a repository tree.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The top-level directory of a build cannot be listed.
    #[error("cannot read repository root '{path}': {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A document or descriptor exists but cannot be read.
    #[error("cannot read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not valid YAML, or does not fit its variant's schema.
    #[error("malformed document '{path}': {reason}")]
    MalformedDocument { path: PathBuf, reason: String },

    /// The `type` field names no known item variant.
    #[error("unknown item type '{variant}' in '{path}'")]
    UnknownVariant { path: PathBuf, variant: String },
}

impl LoadError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        LoadError::MalformedDocument {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Failures while resolving tokens against a built tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no such entry: {token}")]
    NotFound { token: String },

    #[error("'{id}' is not a host item")]
    NotAHost { id: String },

    #[error("host definition '{definition}' needs at least a host item and a category")]
    MalformedHostDefinition { definition: String },

    #[error("no such category: {category} (choices are: {})", choices.join(", "))]
    UnknownCategory {
        category: String,
        choices: Vec<String>,
    },

    #[error("category '{category}' has no hosts")]
    EmptyCategory { category: String },

    #[error("host index {index} is out of range (category has {len} hosts)")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("non-integer host index: {token}")]
    NonIntegerIndex { token: String },

    #[error("no such host alias: {alias} (choices are: {})", choices.join(", "))]
    UnknownAlias { alias: String, choices: Vec<String> },
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
