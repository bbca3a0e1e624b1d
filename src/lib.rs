//! sagacity - spread and use knowledge
//!
//! A directory tree of YAML documents (notes, shell commands, host groups)
//! loaded into memory and exposed as a command hierarchy.
//!
//! ## Key Concepts
//!
//! - **Repository**: one directory; documents become items, subdirectories
//!   become subrepositories
//! - **Item**: `info`, `command` or `host`, chosen by the document's `type`
//! - **Control document**: identifier starting with `_`, kept out of lookups
//! - **Resolution**: argument tokens walk the tree, subrepositories first

pub mod cli;
pub mod config;
pub mod core;

pub use crate::core::error::{LoadError, ResolveError};
pub use crate::core::exec::{Confirm, ExecContext, ExecError, Executor, Outcome, Presenter, SourceUpdater};
pub use crate::core::item::{Category, CommandItem, Host, HostItem, Info, Item, ItemKind};
pub use crate::core::project::{project, CommandNode};
pub use crate::core::repo::{load_repos, BuildOptions, Repo};
pub use crate::core::resolve::Resolved;
