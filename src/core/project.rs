//! Project - Repository tree as a command hierarchy
//!
//! The builder produces maps in whatever order the filesystem and the
//! scheduler happened to deliver. Projection fixes the order once:
//!
//! ```text
//! kb
//! ├── alpha      subrepositories, sorted
//! ├── zeta
//! ├── apple      items, sorted
//! │   └── ...    per-item subcommands (aliases, categories, hosts), sorted
//! └── banana
//! ```
//!
//! Every node carries the action to run when it is the last one named on the
//! command line.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::error::ResolveError;
use super::exec::{ExecContext, ExecError, Outcome};
use super::item::{Host, Item, ItemKind};
use super::repo::Repo;

/// What a node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Repo,
    Info,
    Command,
    Host,
    /// Host alias of a command
    Target,
    /// Category of a host item
    Category,
    /// Single host inside a category
    Machine,
}

/// One entry in the command hierarchy
#[derive(Debug, Clone, Serialize)]
pub struct CommandNode {
    pub name: String,

    pub about: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub kind: NodeKind,

    #[serde(skip)]
    pub action: Action,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandNode>,
}

/// What runs when a node is invoked
#[derive(Debug, Clone)]
pub enum Action {
    /// Print the node's children
    List,

    /// Execute an item, with `preset` arguments in front of the user's
    Execute {
        repo: Arc<Repo>,
        item: Arc<Item>,
        preset: Vec<String>,
    },
}

/// Project a repository (and everything below it) into a command node.
pub fn project(repo: &Arc<Repo>) -> CommandNode {
    let subrepo_keys = repo.subrepo_keys();
    let mut subcommands = Vec::with_capacity(repo.items().len() + subrepo_keys.len());

    for key in &subrepo_keys {
        if let Some(sub) = repo.subrepo(key) {
            subcommands.push(project(sub));
        }
    }

    for key in repo.keys() {
        // the subrepository of the same name shadows the item
        if subrepo_keys.contains(&key) {
            continue;
        }
        if let Some(item) = repo.item(key) {
            subcommands.push(item_node(repo, item));
        }
    }

    CommandNode {
        name: repo.key().to_string(),
        about: repo.summary().to_string(),
        alias: repo.alias().map(String::from),
        kind: NodeKind::Repo,
        action: Action::List,
        subcommands,
    }
}

fn item_node(repo: &Arc<Repo>, item: &Arc<Item>) -> CommandNode {
    let kind = match item.kind() {
        ItemKind::Info(_) => NodeKind::Info,
        ItemKind::Command(_) => NodeKind::Command,
        ItemKind::Host(_) => NodeKind::Host,
    };

    CommandNode {
        name: item.id().to_string(),
        about: item.summary().to_string(),
        alias: None,
        kind,
        action: execute(repo, item, Vec::new()),
        subcommands: item.subcommands(repo),
    }
}

fn execute(repo: &Arc<Repo>, item: &Arc<Item>, preset: Vec<String>) -> Action {
    Action::Execute {
        repo: Arc::clone(repo),
        item: Arc::clone(item),
        preset,
    }
}

impl Item {
    /// Nested commands an item contributes below its own node.
    ///
    /// - command: one per host alias
    /// - host: one per category, each with one per host (by FQDN)
    pub fn subcommands(self: &Arc<Self>, repo: &Arc<Repo>) -> Vec<CommandNode> {
        match self.kind() {
            ItemKind::Info(_) => Vec::new(),
            ItemKind::Command(command) => command
                .hosts
                .iter()
                .map(|(alias, definition)| CommandNode {
                    name: alias.clone(),
                    about: definition.clone(),
                    alias: None,
                    kind: NodeKind::Target,
                    action: execute(repo, self, vec![alias.clone()]),
                    subcommands: Vec::new(),
                })
                .collect(),
            ItemKind::Host(hosts) => hosts
                .types
                .iter()
                .map(|(name, category)| {
                    let mut machines: Vec<(usize, &Host)> =
                        category.hosts.iter().enumerate().collect();
                    machines.sort_by(|a, b| a.1.fqdn.cmp(&b.1.fqdn));

                    let mut seen = HashSet::new();
                    let subcommands = machines
                        .into_iter()
                        .filter(|&(_, host)| seen.insert(host.fqdn.as_str()))
                        .map(|(index, host)| CommandNode {
                            name: host.fqdn.clone(),
                            about: host.summary.clone(),
                            alias: None,
                            kind: NodeKind::Machine,
                            action: execute(repo, self, vec![name.clone(), index.to_string()]),
                            subcommands: Vec::new(),
                        })
                        .collect();

                    CommandNode {
                        name: name.clone(),
                        about: category.summary.clone(),
                        alias: None,
                        kind: NodeKind::Category,
                        action: execute(repo, self, vec![name.clone()]),
                        subcommands,
                    }
                })
                .collect(),
        }
    }
}

impl CommandNode {
    /// Names of the direct children, in order
    pub fn names(&self) -> Vec<&str> {
        self.subcommands.iter().map(|c| c.name.as_str()).collect()
    }

    /// Direct child by name or alias
    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.subcommands
            .iter()
            .find(|c| c.name == name)
            .or_else(|| {
                self.subcommands
                    .iter()
                    .find(|c| c.alias.as_deref() == Some(name))
            })
    }

    /// Descendant along a path of names
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        path.iter()
            .try_fold(self, |node, name| node.child(name.as_ref()))
    }

    /// Invoke this node with the user's trailing arguments.
    pub fn run<S: AsRef<str>>(
        &self,
        args: &[S],
        ctx: &mut ExecContext<'_>,
    ) -> Result<Outcome, ExecError> {
        match &self.action {
            Action::List => {
                // a name clap did not match is a typo, not an argument
                if let Some(token) = args.first() {
                    return Err(ResolveError::NotFound {
                        token: token.as_ref().to_string(),
                    }
                    .into());
                }
                ctx.presenter.children(self)?;
                Ok(Outcome::Listed)
            }
            Action::Execute { repo, item, preset } => {
                let args: Vec<&str> = preset
                    .iter()
                    .map(String::as_str)
                    .chain(args.iter().map(AsRef::as_ref))
                    .collect();
                item.execute(repo, &args, ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exec::tests::{Answer, RecordingExecutor, Transcript};
    use crate::core::repo::tests::{info, knowledge_base, write};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_subrepos_before_items_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "zeta/z.yaml", &info("z"));
        write(root, "alpha/a.yaml", &info("a"));
        write(root, "banana.yaml", &info("banana"));
        write(root, "apple.yaml", &info("apple"));
        write(root, "_hidden.yaml", &info("hidden"));

        let repo = Repo::build(root).await.unwrap();
        for _ in 0..3 {
            assert_eq!(
                project(&repo).names(),
                vec!["alpha", "zeta", "apple", "banana"]
            );
        }
    }

    #[tokio::test]
    async fn test_projection_is_stable_across_builds() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for i in 0..40 {
            write(root, &format!("doc{i}.yaml"), &info("x"));
            write(root, &format!("sub{i}/inner.yaml"), &info("y"));
        }

        let first = project(&Repo::build(root).await.unwrap()).names().join(",");
        for _ in 0..3 {
            let again = project(&Repo::build(root).await.unwrap()).names().join(",");
            assert_eq!(first, again);
        }
    }

    #[tokio::test]
    async fn test_item_shadowed_by_subrepo() {
        let dir = tempdir().unwrap();
        write(dir.path(), "dup.yaml", &info("item"));
        write(dir.path(), "dup/inner.yaml", &info("inner"));

        let node = project(&Repo::build(dir.path()).await.unwrap());
        assert_eq!(node.names(), vec!["dup"]);
        assert_eq!(node.subcommands[0].kind, NodeKind::Repo);
    }

    #[tokio::test]
    async fn test_item_subcommands() {
        let dir = tempdir().unwrap();
        let kb = knowledge_base(dir.path());
        let node = project(&Repo::build(&kb).await.unwrap());

        assert_eq!(node.name, "kb");
        assert_eq!(node.about, "knowledge base");
        assert_eq!(node.names(), vec!["ops", "hosts", "intro"]);

        let deploy = node.find(&["ops", "deploy"]).unwrap();
        assert_eq!(deploy.kind, NodeKind::Command);
        assert_eq!(deploy.names(), vec!["prod"]);
        assert_eq!(deploy.subcommands[0].about, "hosts prod");

        let hosts = node.child("hosts").unwrap();
        assert_eq!(hosts.names(), vec!["prod", "staging"]);
        assert_eq!(
            hosts.child("prod").unwrap().names(),
            vec!["web1.example.net", "web2.example.net"]
        );
        assert!(node.find(&["intro", "anything"]).is_none());
    }

    #[tokio::test]
    async fn test_machine_node_selects_its_own_index() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "db.yaml",
            concat!(
                "type: host\n",
                "types:\n",
                "  ro:\n",
                "    hosts:\n",
                "      - fqdn: zz.example\n",
                "      - fqdn: aa.example\n",
            ),
        );
        let node = project(&Repo::build(dir.path()).await.unwrap());
        let ro = node.find(&["db", "ro"]).unwrap();
        assert_eq!(ro.names(), vec!["aa.example", "zz.example"]);

        let executor = RecordingExecutor::default();
        let answer = Answer::new(true);
        let mut transcript = Transcript::default();
        let mut ctx = ExecContext {
            executor: &executor,
            confirm: &answer,
            presenter: &mut transcript,
        };

        let empty: [&str; 0] = [];
        ro.child("aa.example").unwrap().run(&empty, &mut ctx).unwrap();
        ro.run(&empty, &mut ctx).unwrap();

        let runs = executor.runs.borrow();
        assert_eq!(runs[0].1, "aa.example");
        // no primary flagged: first in document order
        assert_eq!(runs[1].1, "zz.example");
    }

    #[tokio::test]
    async fn test_repo_node_lists_children() {
        let dir = tempdir().unwrap();
        let node = project(&Repo::build(knowledge_base(dir.path())).await.unwrap());

        let executor = RecordingExecutor::default();
        let answer = Answer::new(false);
        let mut transcript = Transcript::default();
        let mut ctx = ExecContext {
            executor: &executor,
            confirm: &answer,
            presenter: &mut transcript,
        };

        let empty: [&str; 0] = [];
        assert_eq!(node.run(&empty, &mut ctx).unwrap(), Outcome::Listed);
        assert_eq!(transcript.lines, vec!["ops", "hosts", "intro"]);
    }

    #[tokio::test]
    async fn test_repo_node_rejects_unknown_name() {
        let dir = tempdir().unwrap();
        let node = project(&Repo::build(knowledge_base(dir.path())).await.unwrap());
        let ops = node.child("ops").unwrap();

        let executor = RecordingExecutor::default();
        let answer = Answer::new(true);
        let mut transcript = Transcript::default();
        let mut ctx = ExecContext {
            executor: &executor,
            confirm: &answer,
            presenter: &mut transcript,
        };

        let err = ops.run(&["typo", "more"], &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            ExecError::Resolve(ResolveError::NotFound { ref token }) if token == "typo"
        ));
        assert!(transcript.lines.is_empty());
        assert!(executor.runs.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_serializes_without_actions() {
        let dir = tempdir().unwrap();
        let node = project(&Repo::build(knowledge_base(dir.path())).await.unwrap());

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["name"], "kb");
        assert_eq!(json["kind"], "repo");
        assert_eq!(json["subcommands"][0]["name"], "ops");
        assert!(json.get("action").is_none());
    }
}
