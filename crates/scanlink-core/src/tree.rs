//! Client-side cache of the remote directory tree.
//!
//! The server sends the first few levels eagerly (`filelist`) and deeper
//! levels on demand (`supplementalfiles`). The cache owns the tree; the
//! rendering collaborator only ever reads it. Merges set a node's
//! `children` in place and never replace the node itself, so any UI-side
//! identity attached to a node survives a merge.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kind of a remote filesystem entry, as classified by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Root,
    Picture,
    Js,
    Html,
    Video,
    Text,
    #[default]
    Default,
}

impl EntryKind {
    /// Whether entries of this kind can have children.
    pub fn is_container(&self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::Root)
    }
}

/// One remote filesystem entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Display name.
    pub text: String,
    /// Absolute remote path.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    /// True while the node's real children have not been fetched yet.
    /// Cleared implicitly when a merge populates `children`.
    #[serde(default)]
    pub expand: bool,
    /// Child entries, absent until fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DirectoryEntry>>,
}

/// Outcome of a merge attempt.
///
/// `PathNotFound` covers stale or out-of-order responses referencing nodes
/// that no longer exist; the tree is left untouched in that case.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The target node's children were set.
    Merged,
    /// No node matched the path; the tree was not mutated.
    PathNotFound,
}

/// Partially-loaded tree of remote filesystem entries.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    /// Leading path components (e.g. `["home", "alice"]`) that the cached
    /// tree is rooted below; skipped when resolving merge paths.
    root_prefix: Vec<String>,
    entries: Vec<DirectoryEntry>,
}

impl DirectoryCache {
    /// Create an empty cache rooted below `root_prefix`.
    ///
    /// An empty prefix means merge paths are walked from their first
    /// component.
    pub fn new(root_prefix: &str) -> Self {
        Self {
            root_prefix: components(root_prefix),
            entries: Vec::new(),
        }
    }

    /// Replace the entire cached tree with a freshly fetched one.
    pub fn replace(&mut self, entries: Vec<DirectoryEntry>) {
        self.entries = entries;
    }

    /// Set the children of the node addressed by `path`.
    ///
    /// The path is resolved component-by-component after stripping the root
    /// prefix; the first sibling whose `text` matches wins at each level.
    /// If any component has no match the merge aborts without mutating the
    /// tree and reports `PathNotFound`.
    pub fn merge(&mut self, path: &str, children: Vec<DirectoryEntry>) -> MergeOutcome {
        let mut remaining = components(path);

        if remaining.len() <= self.root_prefix.len()
            || !remaining.starts_with(&self.root_prefix)
        {
            debug!(path, "merge path does not extend the root prefix");
            return MergeOutcome::PathNotFound;
        }
        remaining.drain(..self.root_prefix.len());

        // Two passes: resolve first so a dead-end path mutates nothing.
        let mut level: &[DirectoryEntry] = &self.entries;
        for (depth, component) in remaining.iter().enumerate() {
            let Some(entry) = level.iter().find(|e| e.text == *component) else {
                debug!(path, component = %component, "no matching entry, ignoring merge");
                return MergeOutcome::PathNotFound;
            };
            if depth + 1 < remaining.len() {
                match &entry.children {
                    Some(next) => level = next,
                    None => {
                        debug!(path, component = %component, "entry has no children to descend into");
                        return MergeOutcome::PathNotFound;
                    }
                }
            }
        }

        let mut node: &mut Vec<DirectoryEntry> = &mut self.entries;
        for (depth, component) in remaining.iter().enumerate() {
            let idx = node
                .iter()
                .position(|e| e.text == *component)
                .expect("resolved above");
            if depth + 1 == remaining.len() {
                node[idx].children = Some(children);
                node[idx].expand = false;
                return MergeOutcome::Merged;
            }
            node = node[idx].children.as_mut().expect("resolved above");
        }

        unreachable!("remaining is non-empty")
    }

    /// The cached tree.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no listing has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn components(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(text: &str, path: &str, children: Option<Vec<DirectoryEntry>>) -> DirectoryEntry {
        DirectoryEntry {
            text: text.into(),
            path: path.into(),
            kind: EntryKind::Directory,
            expand: children.is_none(),
            children,
        }
    }

    fn file(text: &str, path: &str) -> DirectoryEntry {
        DirectoryEntry {
            text: text.into(),
            path: path.into(),
            kind: EntryKind::File,
            expand: false,
            children: None,
        }
    }

    /// Tree rooted below /home/alice: [data (expand), notes.txt]
    fn alice_cache() -> DirectoryCache {
        let mut cache = DirectoryCache::new("/home/alice");
        cache.replace(vec![
            dir("data", "/home/alice/data", None),
            file("notes.txt", "/home/alice/notes.txt"),
        ]);
        cache
    }

    #[test]
    fn merge_sets_children_of_target_node() {
        let mut cache = alice_cache();
        let fetched = vec![
            dir("scans", "/home/alice/data/scans", None),
            file("index.json", "/home/alice/data/index.json"),
        ];

        let outcome = cache.merge("/home/alice/data", fetched.clone());
        assert_eq!(outcome, MergeOutcome::Merged);

        let data = &cache.entries()[0];
        assert_eq!(data.children.as_deref(), Some(&fetched[..]));
        assert!(!data.expand);
        // Sibling untouched
        assert_eq!(cache.entries()[1], file("notes.txt", "/home/alice/notes.txt"));
    }

    #[test]
    fn merge_walks_nested_components() {
        let mut cache = alice_cache();
        assert_eq!(
            cache.merge(
                "/home/alice/data",
                vec![dir("scans", "/home/alice/data/scans", None)],
            ),
            MergeOutcome::Merged
        );

        let fetched = vec![
            file("t1.nii.gz", "/home/alice/data/scans/t1.nii.gz"),
            file("t2.nii.gz", "/home/alice/data/scans/t2.nii.gz"),
        ];
        assert_eq!(
            cache.merge("/home/alice/data/scans", fetched.clone()),
            MergeOutcome::Merged
        );

        let scans = cache.entries()[0].children.as_ref().unwrap()[0]
            .children
            .as_ref()
            .unwrap();
        assert_eq!(scans, &fetched);
    }

    #[test]
    fn merge_absent_path_leaves_tree_unchanged() {
        let mut cache = alice_cache();
        let before = cache.entries().to_vec();

        let outcome = cache.merge("/home/alice/removed", vec![file("x", "/home/alice/removed/x")]);
        assert_eq!(outcome, MergeOutcome::PathNotFound);
        assert_eq!(cache.entries(), &before[..]);
    }

    #[test]
    fn merge_dead_end_midway_leaves_tree_unchanged() {
        let mut cache = alice_cache();
        let before = cache.entries().to_vec();

        // `data` exists but has no children yet, so the walk cannot descend.
        let outcome = cache.merge(
            "/home/alice/data/scans",
            vec![file("t1.nii.gz", "/home/alice/data/scans/t1.nii.gz")],
        );
        assert_eq!(outcome, MergeOutcome::PathNotFound);
        assert_eq!(cache.entries(), &before[..]);
    }

    #[test]
    fn merge_path_outside_prefix_is_not_found() {
        let mut cache = alice_cache();
        assert_eq!(
            cache.merge("/home/bob/data", vec![]),
            MergeOutcome::PathNotFound
        );
        // Prefix alone is not a node either
        assert_eq!(cache.merge("/home/alice", vec![]), MergeOutcome::PathNotFound);
    }

    #[test]
    fn merge_first_sibling_match_wins() {
        let mut cache = DirectoryCache::new("");
        cache.replace(vec![
            dir("data", "/srv/data", None),
            dir("data", "/srv/data-duplicate", None),
        ]);

        let fetched = vec![file("a", "/srv/data/a")];
        assert_eq!(cache.merge("/data", fetched.clone()), MergeOutcome::Merged);

        assert_eq!(cache.entries()[0].children.as_deref(), Some(&fetched[..]));
        assert!(cache.entries()[1].children.is_none());
    }

    #[test]
    fn replace_discards_previous_tree() {
        let mut cache = alice_cache();
        cache.replace(vec![file("fresh.txt", "/home/alice/fresh.txt")]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entries()[0].text, "fresh.txt");
    }

    #[test]
    fn empty_prefix_walks_full_path() {
        let mut cache = DirectoryCache::new("");
        cache.replace(vec![dir(
            "srv",
            "/srv",
            Some(vec![dir("images", "/srv/images", None)]),
        )]);

        assert_eq!(
            cache.merge("/srv/images", vec![file("a.png", "/srv/images/a.png")]),
            MergeOutcome::Merged
        );
    }

    #[test]
    fn entry_kind_containers() {
        assert!(EntryKind::Directory.is_container());
        assert!(EntryKind::Root.is_container());
        assert!(!EntryKind::File.is_container());
        assert!(!EntryKind::Picture.is_container());
    }
}
