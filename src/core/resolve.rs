//! Resolve - Turning argument tokens into tree entries
//!
//! # Rules
//! - No tokens left: the current repository is the answer.
//! - A token naming a subrepository descends into it, even when an item of the
//!   same name exists. Subrepositories always win.
//! - Otherwise a token naming an item ends the walk; whatever follows is handed
//!   back as leftover arguments for that item.
//! - Anything else is [`ResolveError::NotFound`] for that token.
//!
//! Host definitions (`"db master"`, `"db ro 2"`) are resolved on top of this,
//! see [`Repo::get_host`].

use std::sync::Arc;

use super::error::{ResolveError, ResolveResult};
use super::item::{Category, CommandItem, Host, HostItem, Item, ItemKind};
use super::repo::Repo;

/// Subrepository searched for host items when a definition does not resolve
/// from the root directly
pub const HOSTS_REPO: &str = "hosts";

/// Where a token sequence ended up
#[derive(Debug, Clone)]
pub enum Resolved {
    /// All tokens consumed by subrepositories
    Repo(Arc<Repo>),

    /// An item, the repository holding it, and the unconsumed tokens
    Item {
        repo: Arc<Repo>,
        item: Arc<Item>,
        rest: Vec<String>,
    },
}

impl Repo {
    /// Walk `tokens` down from this repository.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] naming the first token that matches neither
    /// a subrepository nor an item.
    pub fn resolve<S: AsRef<str>>(self: &Arc<Self>, tokens: &[S]) -> ResolveResult<Resolved> {
        let mut current = Arc::clone(self);
        let mut rest = tokens;

        while let Some((first, tail)) = rest.split_first() {
            let token = first.as_ref();

            if let Some(sub) = current.subrepo(token).cloned() {
                current = sub;
                rest = tail;
                continue;
            }

            return match current.item(token).cloned() {
                Some(item) => Ok(Resolved::Item {
                    repo: current,
                    item,
                    rest: tail.iter().map(|s| s.as_ref().to_string()).collect(),
                }),
                None => Err(ResolveError::NotFound {
                    token: token.to_string(),
                }),
            };
        }

        Ok(Resolved::Repo(current))
    }

    /// Find the host a definition string points at.
    ///
    /// The definition is `"<host-item> <category>[ <index>]"`, where
    /// `<host-item>` may be a path of several tokens. It is resolved from this
    /// repository first, then from its `hosts` subrepository.
    ///
    /// # Errors
    /// Any [`ResolveError`] from walking the tree or selecting the host.
    pub fn get_host(self: &Arc<Self>, definition: &str) -> ResolveResult<Host> {
        let malformed = || ResolveError::MalformedHostDefinition {
            definition: definition.to_string(),
        };

        let tokens: Vec<&str> = definition.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(malformed());
        }

        let resolved = match self.resolve(&tokens) {
            Err(ResolveError::NotFound { .. }) if self.subrepo(HOSTS_REPO).is_some() => self
                .subrepo(HOSTS_REPO)
                .map(|hosts| hosts.resolve(&tokens))
                .unwrap_or_else(|| Err(malformed())),
            other => other,
        }?;

        let (item, rest) = match resolved {
            Resolved::Item { item, rest, .. } => (item, rest),
            // every token named a directory, none of them a host item
            Resolved::Repo(_) => {
                return Err(ResolveError::NotFound {
                    token: tokens[tokens.len() - 1].to_string(),
                });
            }
        };

        let ItemKind::Host(hosts) = item.kind() else {
            return Err(ResolveError::NotAHost {
                id: item.id().to_string(),
            });
        };

        let (category, index) = match rest.as_slice() {
            [category] => (category, None),
            [category, index] => (category, Some(index.as_str())),
            _ => return Err(malformed()),
        };
        hosts.select(category, index).cloned()
    }
}

impl HostItem {
    /// Sorted category names
    pub fn category_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    pub fn category(&self, name: &str) -> ResolveResult<&Category> {
        self.types
            .get(name)
            .ok_or_else(|| ResolveError::UnknownCategory {
                category: name.to_string(),
                choices: self.category_names().into_iter().map(String::from).collect(),
            })
    }

    /// Pick a host: the category's primary without an index, the indexed
    /// host otherwise.
    pub fn select(&self, category: &str, index: Option<&str>) -> ResolveResult<&Host> {
        let cat = self.category(category)?;
        match index {
            None => cat.primary_host().ok_or_else(|| ResolveError::EmptyCategory {
                category: category.to_string(),
            }),
            Some(token) => {
                let index: i64 = token.parse().map_err(|_| ResolveError::NonIntegerIndex {
                    token: token.to_string(),
                })?;
                cat.host(index)
            }
        }
    }
}

impl Category {
    /// First host flagged primary, else the first host
    pub fn primary_host(&self) -> Option<&Host> {
        self.hosts
            .iter()
            .find(|h| h.primary)
            .or_else(|| self.hosts.first())
    }

    pub fn host(&self, index: i64) -> ResolveResult<&Host> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.hosts.get(i))
            .ok_or(ResolveError::IndexOutOfRange {
                index,
                len: self.hosts.len(),
            })
    }
}

impl CommandItem {
    /// Sorted host aliases
    pub fn aliases(&self) -> Vec<&str> {
        self.hosts.keys().map(String::as_str).collect()
    }

    /// Host definition behind an alias
    pub fn target(&self, alias: &str) -> ResolveResult<&str> {
        self.hosts
            .get(alias)
            .map(String::as_str)
            .ok_or_else(|| ResolveError::UnknownAlias {
                alias: alias.to_string(),
                choices: self.aliases().into_iter().map(String::from).collect(),
            })
    }
}
