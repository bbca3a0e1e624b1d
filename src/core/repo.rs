//! Repo - In-memory tree of repositories
//!
//! A repository is a directory of YAML documents. Every document becomes an
//! [`Item`], every immediate subdirectory becomes a child repository:
//!
//! ```text
//! kb/
//! ├── _repo.yaml        descriptor: key, summary, alias
//! ├── _index.yaml       control item (underscore prefix)
//! ├── intro.yaml        item
//! └── ops/              subrepository
//!     └── deploy.yaml
//! ```
//!
//! # Building
//! Each node lists its directory once, then spawns one task per document and
//! one task per subdirectory on a [`JoinSet`]. The node itself is the only
//! writer of its maps: results come back through `join_next` and are routed
//! into `items`, `control` or `subrepos` from that single place. A node does
//! not return before every task it spawned has finished.
//!
//! Parent links are filled in afterwards, in one pass over the finished tree,
//! so the shared tree is immutable from the moment it is handed out.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::error::LoadError;
use super::item::{identifier, Item};

/// Identifier of the repository descriptor document (`_repo.yaml`)
pub const DESCRIPTOR_ID: &str = "_repo";

/// Knobs for a build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// File extensions treated as documents
    pub extensions: Vec<String>,

    /// When set, a subdirectory only counts as a subrepository if it
    /// contains a file with this name
    pub subrepo_marker: Option<String>,

    /// Upper bound on filesystem reads in flight
    pub max_concurrent_reads: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            subrepo_marker: None,
            max_concurrent_reads: 64,
        }
    }
}

/// Contents of `_repo.yaml`
#[derive(Debug, Default, Deserialize)]
struct Descriptor {
    #[serde(default)]
    key: Option<String>,

    #[serde(default)]
    summary: Option<String>,

    #[serde(default)]
    alias: Option<String>,
}

/// One directory's worth of knowledge
#[derive(Debug)]
pub struct Repo {
    key: String,
    summary: String,
    alias: Option<String>,
    items: HashMap<String, Arc<Item>>,
    control: HashMap<String, Arc<Item>>,
    subrepos: HashMap<String, Arc<Repo>>,
    parent: Option<Weak<Repo>>,
    root: PathBuf,
}

impl Repo {
    /// Build the repository tree rooted at `path` with default options.
    ///
    /// # Errors
    /// Only [`LoadError::RootUnreadable`] when `path` itself cannot be listed.
    /// Broken documents and unreadable subdirectories are logged and left out.
    pub async fn build(path: impl AsRef<Path>) -> Result<Arc<Repo>, LoadError> {
        Self::build_with(path, &BuildOptions::default()).await
    }

    /// Build the repository tree rooted at `path`.
    pub async fn build_with(
        path: impl AsRef<Path>,
        options: &BuildOptions,
    ) -> Result<Arc<Repo>, LoadError> {
        let ctx = BuildContext::new(options);
        build_root(path.as_ref(), ctx).await
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Directory this repository was built from
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn items(&self) -> &HashMap<String, Arc<Item>> {
        &self.items
    }

    pub fn control(&self) -> &HashMap<String, Arc<Item>> {
        &self.control
    }

    pub fn subrepos(&self) -> &HashMap<String, Arc<Repo>> {
        &self.subrepos
    }

    pub fn item(&self, id: &str) -> Option<&Arc<Item>> {
        self.items.get(id)
    }

    pub fn subrepo(&self, key: &str) -> Option<&Arc<Repo>> {
        self.subrepos.get(key)
    }

    /// Sorted item identifiers
    pub fn keys(&self) -> Vec<&str> {
        sorted_keys(&self.items)
    }

    /// Sorted subrepository identifiers
    pub fn subrepo_keys(&self) -> Vec<&str> {
        sorted_keys(&self.subrepos)
    }

    pub fn parent(&self) -> Option<Arc<Repo>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Walk up the parent links to the top of the tree.
    ///
    /// Command items use this to find the hosts they refer to, which live
    /// relative to the root rather than to the command's own directory.
    pub fn root(self: &Arc<Self>) -> Arc<Repo> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} items, {} subrepos)",
            self.key,
            self.items.len(),
            self.subrepos.len()
        )
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Load every configured repository concurrently, keyed by identifier.
///
/// Directories without a descriptor are skipped, and so are repositories
/// whose root cannot be read. Both are logged.
pub async fn load_repos(paths: &[PathBuf], options: &BuildOptions) -> BTreeMap<String, Arc<Repo>> {
    let ctx = BuildContext::new(options);
    let mut tasks = JoinSet::new();

    for path in paths {
        if find_descriptor(path, &ctx.options).await.is_none() {
            debug!("Skipping {}: no {} found", path.display(), DESCRIPTOR_ID);
            continue;
        }

        let ctx = Arc::clone(&ctx);
        let path = path.clone();
        tasks.spawn(async move { build_root(&path, ctx).await });
    }

    let mut repos: BTreeMap<String, Arc<Repo>> = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(repo)) => match repos.get(repo.key()) {
                Some(existing) if existing.path() <= repo.path() => {
                    warn!(
                        "Ignoring {}: repository key '{}' already used by {}",
                        repo.path().display(),
                        repo.key(),
                        existing.path().display()
                    );
                }
                _ => {
                    repos.insert(repo.key().to_string(), repo);
                }
            },
            Ok(Err(e)) => warn!("Skipping repository: {}", e),
            Err(e) => warn!("Repository load task failed: {}", e),
        }
    }

    repos
}

// ============== Building ==============

struct BuildContext {
    options: BuildOptions,
    reads: Semaphore,
}

impl BuildContext {
    fn new(options: &BuildOptions) -> Arc<Self> {
        Arc::new(Self {
            options: options.clone(),
            reads: Semaphore::new(options.max_concurrent_reads.max(1)),
        })
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let _permit = self.permit().await?;
        tokio::fs::read(path).await
    }

    async fn permit(&self) -> io::Result<tokio::sync::SemaphorePermit<'_>> {
        self.reads
            .acquire()
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// A node under construction, before parent links exist
#[derive(Debug)]
struct Draft {
    key: String,
    summary: String,
    alias: Option<String>,
    items: HashMap<String, Item>,
    control: HashMap<String, Item>,
    subrepos: HashMap<String, Draft>,
    root: PathBuf,
}

/// What a spawned unit of work hands back to its node
enum Built {
    Item(Item),
    Subrepo(Draft),
    Skipped,
}

/// Direct children of a directory, partitioned
#[derive(Debug, Default)]
struct Listing {
    descriptor: Option<PathBuf>,
    documents: Vec<PathBuf>,
    subdirs: Vec<PathBuf>,
}

async fn build_root(path: &Path, ctx: Arc<BuildContext>) -> Result<Arc<Repo>, LoadError> {
    let root = tokio::fs::canonicalize(path)
        .await
        .map_err(|source| LoadError::RootUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let draft = build_node(root, ctx).await?;
    Ok(draft.link(None))
}

fn build_node(dir: PathBuf, ctx: Arc<BuildContext>) -> BoxFuture<'static, Result<Draft, LoadError>> {
    async move {
        let listing = list_children(&dir, &ctx)
            .await
            .map_err(|source| LoadError::RootUnreadable {
                path: dir.clone(),
                source,
            })?;

        let descriptor = match &listing.descriptor {
            Some(path) => read_descriptor(path, &ctx).await,
            None => Descriptor::default(),
        };

        let mut tasks = JoinSet::new();

        for path in listing.documents {
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                match load_item(&path, &ctx).await {
                    Ok(item) => Built::Item(item),
                    Err(e) => {
                        warn!("Failed to load item: {}", e);
                        Built::Skipped
                    }
                }
            });
        }

        for path in listing.subdirs {
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                match build_node(path, ctx).await {
                    Ok(draft) => Built::Subrepo(draft),
                    Err(e) => {
                        warn!("Failed to load subrepository: {}", e);
                        Built::Skipped
                    }
                }
            });
        }

        let mut draft = Draft::new(dir, descriptor);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Built::Item(item)) => draft.insert_item(item),
                Ok(Built::Subrepo(sub)) => draft.insert_subrepo(sub),
                Ok(Built::Skipped) => {}
                Err(e) => warn!("Build task in {} failed: {}", draft.root.display(), e),
            }
        }

        debug!(
            "Built {} ({} items, {} control, {} subrepos)",
            draft.key,
            draft.items.len(),
            draft.control.len(),
            draft.subrepos.len()
        );

        Ok(draft)
    }
    .boxed()
}

async fn list_children(dir: &Path, ctx: &BuildContext) -> io::Result<Listing> {
    let _permit = ctx.permit().await?;
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut listing = Listing::default();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name();

        // .git and friends
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        // symlinked documents are read through, symlinked directories are
        // never descended into, so the tree stays finite
        let is_file = if file_type.is_symlink() {
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => true,
                Ok(_) => {
                    debug!("Skipping {}: symlink to a directory", path.display());
                    continue;
                }
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            }
        } else {
            file_type.is_file()
        };

        if file_type.is_dir() {
            if is_subrepo(&path, &ctx.options).await {
                listing.subdirs.push(path);
            }
        } else if is_file && has_document_extension(&path, &ctx.options) {
            if identifier(&path) == DESCRIPTOR_ID {
                // `_repo.yaml` next to `_repo.yml`: the lower path wins
                match &listing.descriptor {
                    Some(existing) if *existing <= path => {
                        warn!(
                            "Ignoring {}: repo file {} already found",
                            path.display(),
                            existing.display()
                        );
                    }
                    _ => listing.descriptor = Some(path),
                }
            } else {
                listing.documents.push(path);
            }
        }
    }

    Ok(listing)
}

async fn is_subrepo(dir: &Path, options: &BuildOptions) -> bool {
    match &options.subrepo_marker {
        Some(marker) => tokio::fs::metadata(dir.join(marker)).await.is_ok(),
        None => true,
    }
}

fn has_document_extension(path: &Path, options: &BuildOptions) -> bool {
    path.extension()
        .map(|ext| options.extensions.iter().any(|e| ext == e.as_str()))
        .unwrap_or(false)
}

async fn find_descriptor(dir: &Path, options: &BuildOptions) -> Option<PathBuf> {
    for ext in &options.extensions {
        let path = dir.join(format!("{}.{}", DESCRIPTOR_ID, ext));
        if tokio::fs::metadata(&path).await.is_ok() {
            return Some(path);
        }
    }
    None
}

async fn read_descriptor(path: &Path, ctx: &BuildContext) -> Descriptor {
    let data = match ctx.read(path).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Reading repo file {} failed: {}", path.display(), e);
            return Descriptor::default();
        }
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Descriptor::default();
    }

    serde_yaml::from_slice(&data).unwrap_or_else(|e| {
        warn!("Malformed repo file {}: {}", path.display(), e);
        Descriptor::default()
    })
}

async fn load_item(path: &Path, ctx: &BuildContext) -> Result<Item, LoadError> {
    let data = ctx.read(path).await.map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Item::classify(path, &data)
}

impl Draft {
    fn new(root: PathBuf, descriptor: Descriptor) -> Self {
        let key = descriptor.key.unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Self {
            key,
            summary: descriptor.summary.unwrap_or_default(),
            alias: descriptor.alias,
            items: HashMap::new(),
            control: HashMap::new(),
            subrepos: HashMap::new(),
            root,
        }
    }

    fn insert_item(&mut self, item: Item) {
        let map = if item.is_control() {
            &mut self.control
        } else {
            &mut self.items
        };

        // `x.yaml` next to `x.yml`: the lower path wins, whatever order they arrived in
        match map.get(item.id()) {
            Some(existing) if existing.path() <= item.path() => {
                warn!(
                    "Ignoring {}: identifier '{}' already used by {}",
                    item.path().display(),
                    item.id(),
                    existing.path().display()
                );
            }
            _ => {
                map.insert(item.id().to_string(), item);
            }
        }
    }

    fn insert_subrepo(&mut self, sub: Draft) {
        match self.subrepos.get(&sub.key) {
            Some(existing) if existing.root <= sub.root => {
                warn!(
                    "Ignoring {}: key '{}' already used by {}",
                    sub.root.display(),
                    sub.key,
                    existing.root.display()
                );
            }
            _ => {
                self.subrepos.insert(sub.key.clone(), sub);
            }
        }
    }

    /// Freeze the draft into a shared node, pointing every child back at it.
    fn link(self, parent: Option<Weak<Repo>>) -> Arc<Repo> {
        Arc::new_cyclic(|me| {
            let subrepos = self
                .subrepos
                .into_iter()
                .map(|(key, sub)| (key, sub.link(Some(me.clone()))))
                .collect();

            Repo {
                key: self.key,
                summary: self.summary,
                alias: self.alias,
                items: into_shared(self.items),
                control: into_shared(self.control),
                subrepos,
                parent,
                root: self.root,
            }
        })
    }
}

fn into_shared(items: HashMap<String, Item>) -> HashMap<String, Arc<Item>> {
    items.into_iter().map(|(k, v)| (k, Arc::new(v))).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::item::ItemKind;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub(crate) fn info(body: &str) -> String {
        format!("type: info\nsummary: {body} summary\nbody: {body}\n")
    }

    /// The `kb/` tree used across the core tests
    pub(crate) fn knowledge_base(root: &Path) -> PathBuf {
        let kb = root.join("kb");
        write(&kb, "_repo.yaml", "key: kb\nsummary: knowledge base\n");
        write(&kb, "intro.yaml", "type: info\nsummary: intro\nbody: hello\n");
        write(
            &kb,
            "ops/deploy.yaml",
            "type: command\nsummary: deploy\ncommand: echo hi\nhosts:\n  prod: hosts prod\n",
        );
        write(
            &kb,
            "hosts.yaml",
            concat!(
                "type: host\n",
                "summary: all the machines\n",
                "types:\n",
                "  prod:\n",
                "    summary: production\n",
                "    primary: true\n",
                "    hosts:\n",
                "      - fqdn: web1.example.net\n",
                "      - fqdn: web2.example.net\n",
                "        primary: true\n",
                "  staging:\n",
                "    summary: staging\n",
                "    hosts:\n",
                "      - fqdn: stage1.example.net\n",
            ),
        );
        kb
    }

    #[tokio::test]
    async fn test_partitions_documents_and_subdirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "first.yaml", &info("first"));
        write(root, "second.yml", &info("second"));
        write(root, "_index.yaml", &info("index"));
        write(root, "_meta.yaml", &info("meta"));
        fs::create_dir_all(root.join("one")).unwrap();
        fs::create_dir_all(root.join("two")).unwrap();

        let repo = Repo::build(root).await.unwrap();

        assert_eq!(repo.items().len(), 2);
        assert_eq!(repo.control().len(), 2);
        assert_eq!(repo.subrepos().len(), 2);
        assert_eq!(repo.keys(), vec!["first", "second"]);
        assert!(repo.control().contains_key("_index"));
    }

    #[tokio::test]
    async fn test_key_defaults_to_directory_name() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("notes");
        write(&root, "a.yaml", &info("a"));

        let repo = Repo::build(&root).await.unwrap();
        assert_eq!(repo.key(), "notes");
        assert_eq!(repo.summary(), "");
        assert!(repo.alias().is_none());
    }

    #[tokio::test]
    async fn test_descriptor_seeds_metadata() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("saga-kb");
        write(&root, "_repo.yaml", "key: kb\nsummary: knowledge base\nalias: k\n");

        let repo = Repo::build(&root).await.unwrap();
        assert_eq!(repo.key(), "kb");
        assert_eq!(repo.summary(), "knowledge base");
        assert_eq!(repo.alias(), Some("k"));
        // descriptor is not an item
        assert!(repo.control().is_empty());
        assert!(repo.items().is_empty());
    }

    #[tokio::test]
    async fn test_ignores_junk_and_dotfiles() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for i in 0..50 {
            write(root, &format!("junk-{i}"), "not yaml at all");
            write(root, &format!("junk-{i}.txt"), "type: info\n");
        }
        write(root, ".hidden.yaml", &info("hidden"));
        write(root, ".git/config.yaml", &info("git"));

        let repo = Repo::build(root).await.unwrap();
        assert!(repo.items().is_empty());
        assert!(repo.control().is_empty());
        assert!(repo.subrepos().is_empty());
    }

    #[tokio::test]
    async fn test_nests_deep() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "one/two/three/four/five/first.yaml",
            "type: info\nbody: glitteringprizes\n",
        );

        let repo = Repo::build(dir.path()).await.unwrap();
        let mut node = Arc::clone(&repo);
        for key in ["one", "two", "three", "four"] {
            let next = Arc::clone(node.subrepo(key).unwrap());
            assert!(next.items().is_empty(), "{key} should have no items");
            node = next;
        }
        let five = node.subrepo("five").unwrap();

        let ItemKind::Info(info) = five.item("first").unwrap().kind() else {
            panic!("expected info");
        };
        assert_eq!(info.body, "glitteringprizes");
    }

    #[tokio::test]
    async fn test_broken_documents_do_not_abort_siblings() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "good.yaml", &info("good"));
        write(root, "unknown.yaml", "type: recipe\n");
        write(root, "broken.yaml", "type: [info\n");
        write(root, "notype.yaml", "summary: nothing\n");
        write(root, "sub/fine.yaml", &info("fine"));

        let repo = Repo::build(root).await.unwrap();
        assert_eq!(repo.keys(), vec!["good"]);
        assert!(repo.subrepo("sub").unwrap().item("fine").is_some());
    }

    #[tokio::test]
    async fn test_root_unreadable() {
        let dir = tempdir().unwrap();
        let err = Repo::build(dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, LoadError::RootUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_thousand_siblings() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for i in 0..1000 {
            let name = if i % 10 == 0 {
                format!("_doc{i:04}.yaml")
            } else {
                format!("doc{i:04}.yaml")
            };
            write(root, &name, &info(&format!("doc {i}")));
        }

        let options = BuildOptions {
            max_concurrent_reads: 8,
            ..Default::default()
        };
        let repo = Repo::build_with(root, &options).await.unwrap();

        assert_eq!(repo.items().len() + repo.control().len(), 1000);
        assert_eq!(repo.control().len(), 100);
        assert_eq!(repo.items().len(), 900);
    }

    #[tokio::test]
    async fn test_build_is_idempotent() {
        let dir = tempdir().unwrap();
        let kb = knowledge_base(dir.path());
        write(&kb, "ops/db/_index.yaml", &info("index"));

        let a = Repo::build(&kb).await.unwrap();
        let b = Repo::build(&kb).await.unwrap();

        fn assert_same(a: &Repo, b: &Repo) {
            assert_eq!(a.key(), b.key());
            assert_eq!(a.keys(), b.keys());
            assert_eq!(a.subrepo_keys(), b.subrepo_keys());
            let control_a: BTreeSet<_> = a.control().keys().collect();
            let control_b: BTreeSet<_> = b.control().keys().collect();
            assert_eq!(control_a, control_b);
            for key in a.keys() {
                assert_eq!(a.item(key), b.item(key));
            }
            for key in a.subrepo_keys() {
                assert_same(a.subrepo(key).unwrap(), b.subrepo(key).unwrap());
            }
        }

        assert_same(&a, &b);
    }

    #[tokio::test]
    async fn test_parent_links() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/b/c.yaml", &info("c"));

        let repo = Repo::build(dir.path()).await.unwrap();
        assert!(repo.is_root());
        assert!(repo.parent().is_none());

        let a = Arc::clone(repo.subrepo("a").unwrap());
        let b = Arc::clone(a.subrepo("b").unwrap());
        assert!(!b.is_root());
        assert!(Arc::ptr_eq(&b.parent().unwrap(), &a));
        assert!(Arc::ptr_eq(&b.root(), &repo));
        assert!(Arc::ptr_eq(&repo.root(), &repo));
    }

    #[tokio::test]
    async fn test_subrepo_marker_gates_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "marked/_repo.yaml", "summary: marked\n");
        write(root, "plain/doc.yaml", &info("doc"));

        let options = BuildOptions {
            subrepo_marker: Some("_repo.yaml".to_string()),
            ..Default::default()
        };
        let repo = Repo::build_with(root, &options).await.unwrap();
        assert_eq!(repo.subrepo_keys(), vec!["marked"]);

        let repo = Repo::build(root).await.unwrap();
        assert_eq!(repo.subrepo_keys(), vec!["marked", "plain"]);
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_deterministic() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "same.yaml", "type: info\nbody: from yaml\n");
        write(root, "same.yml", "type: info\nbody: from yml\n");

        for _ in 0..5 {
            let repo = Repo::build(root).await.unwrap();
            let item = repo.item("same").unwrap();
            assert!(item.path().ends_with("same.yaml"));
        }
    }

    #[tokio::test]
    async fn test_duplicate_descriptor_is_deterministic() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("kb");
        write(&root, "_repo.yaml", "key: from-yaml\n");
        write(&root, "_repo.yml", "key: from-yml\n");

        for _ in 0..5 {
            assert_eq!(Repo::build(&root).await.unwrap().key(), "from-yaml");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_directories_are_not_followed() {
        let dir = tempdir().unwrap();
        let kb = knowledge_base(dir.path());
        std::os::unix::fs::symlink(&kb, kb.join("ops/loop")).unwrap();
        std::os::unix::fs::symlink(&kb, kb.join("again")).unwrap();
        write(dir.path(), "shared.yaml", &info("shared"));
        std::os::unix::fs::symlink(dir.path().join("shared.yaml"), kb.join("linked.yaml"))
            .unwrap();

        let repo = Repo::build(&kb).await.unwrap();
        assert_eq!(repo.subrepo_keys(), vec!["ops"]);
        let ops = repo.subrepo("ops").unwrap();
        assert!(ops.subrepos().is_empty());
        assert_eq!(ops.keys(), vec!["deploy"]);
        // documents behind a symlink are still read
        assert!(repo.item("linked").is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subdirectory_does_not_abort_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "good.yaml", &info("good"));
        write(root, "fine/inner.yaml", &info("inner"));
        write(root, "locked/secret.yaml", &info("secret"));

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // permissions are not enforced for this user (root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let repo = Repo::build(root).await.unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(repo.keys(), vec!["good"]);
        assert_eq!(repo.subrepo_keys(), vec!["fine"]);
        assert!(repo.subrepo("fine").unwrap().item("inner").is_some());
    }

    #[tokio::test]
    async fn test_load_repos_requires_descriptor() {
        let dir = tempdir().unwrap();
        let kb = knowledge_base(dir.path());
        let bare = dir.path().join("bare");
        write(&bare, "x.yaml", &info("x"));
        let missing = dir.path().join("missing");

        let repos = load_repos(&[kb, bare, missing], &BuildOptions::default()).await;
        assert_eq!(repos.keys().collect::<Vec<_>>(), vec!["kb"]);
        assert_eq!(repos["kb"].summary(), "knowledge base");
    }
}
