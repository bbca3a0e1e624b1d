//! Item - Typed documents inside a repository
//!
//! Every YAML document in a repository directory becomes exactly one [`Item`].
//! The variant is picked by the document's `type` field:
//!
//! ```yaml
//! type: info
//! summary: How to rotate the logs
//! body: |
//!   Run logrotate by hand ...
//! ```
//!
//! # Classification
//! Decoding happens in two passes. The first pass reads only the `type` field
//! into an [`Envelope`]; the second decodes the whole document into the schema
//! of the variant that field named. A document that fails either pass is an
//! error for that document only.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::LoadError;

/// Prefix that marks control documents (`_repo.yaml`, `_index.yaml`, ...)
pub const CONTROL_MARKER: char = '_';

/// Derive an identifier from a path: the base name with its extension stripped.
pub fn identifier(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Minimal view of a document: just the discriminator.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// A classified document
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    path: PathBuf,
    kind: ItemKind,
}

/// The closed set of item variants
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// Free text, printed on execution
    Info(Info),
    /// A shell command run against hosts
    Command(CommandItem),
    /// Groups of hosts to connect to
    Host(HostItem),
}

/// Free-text note
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub body: String,
}

/// Shell command template with its host targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandItem {
    #[serde(default)]
    pub summary: String,

    /// Command line run on the selected host
    pub command: String,

    /// Host alias -> host definition (`"<host-item> <category>[ <index>]"`)
    #[serde(default)]
    pub hosts: BTreeMap<String, String>,
}

/// A named collection of host categories
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostItem {
    #[serde(default)]
    pub summary: String,

    #[serde(default, alias = "categories")]
    pub types: BTreeMap<String, Category>,
}

/// A group of hosts inside a [`HostItem`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub summary: String,

    /// Marks the category used when none is given
    #[serde(default)]
    pub primary: bool,

    #[serde(default)]
    pub hosts: Vec<Host>,
}

/// One machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Host {
    pub fqdn: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub primary: bool,
}

impl Item {
    /// Classify raw document bytes read from `path`.
    ///
    /// # Errors
    /// - [`LoadError::MalformedDocument`] if either decode pass fails or the
    ///   `type` field is missing
    /// - [`LoadError::UnknownVariant`] if `type` is not `info`, `command` or `host`
    pub fn classify(path: &Path, data: &[u8]) -> Result<Self, LoadError> {
        let envelope: Envelope =
            serde_yaml::from_slice(data).map_err(|e| LoadError::malformed(path, e))?;

        let variant = envelope
            .kind
            .ok_or_else(|| LoadError::malformed(path, "missing `type` field"))?;

        let kind = match variant.as_str() {
            "info" => ItemKind::Info(decode(path, data)?),
            "command" => ItemKind::Command(decode(path, data)?),
            "host" => ItemKind::Host(decode(path, data)?),
            _ => {
                return Err(LoadError::UnknownVariant {
                    path: path.to_path_buf(),
                    variant,
                })
            }
        };

        Ok(Self {
            id: identifier(path),
            path: path.to_path_buf(),
            kind,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn summary(&self) -> &str {
        match &self.kind {
            ItemKind::Info(i) => &i.summary,
            ItemKind::Command(c) => &c.summary,
            ItemKind::Host(h) => &h.summary,
        }
    }

    /// Control documents are kept apart from the normal items of a repository
    pub fn is_control(&self) -> bool {
        self.id.starts_with(CONTROL_MARKER)
    }
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Info(_) => "info",
            ItemKind::Command(_) => "command",
            ItemKind::Host(_) => "host",
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

fn decode<T: serde::de::DeserializeOwned>(path: &Path, data: &[u8]) -> Result<T, LoadError> {
    serde_yaml::from_slice(data).map_err(|e| LoadError::malformed(path, e))
}
