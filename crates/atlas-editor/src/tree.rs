//! Folder tree projection.
//!
//! The tree is a pure function of the ordered path set: a folder appears
//! where the first path mentioning it appears, and siblings keep first-seen
//! order. Expansion is UI state kept outside the tree, keyed by folder path,
//! so it survives rebuilds as long as the folder does.

#![allow(missing_docs)]

use std::fmt::Write as _;

use rustc_hash::FxHashSet;

/// A directory inferred from path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    /// Last segment.
    pub name: String,
    /// Segments joined from the root.
    pub full_path: String,
    pub expanded: bool,
    /// Folders and files in first-seen order.
    pub children: Vec<TreeEntry>,
}

/// A file leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub full_path: String,
}

/// A tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Folder(FolderNode),
    File(FileNode),
}

impl TreeEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.name,
            Self::File(file) => &file.name,
        }
    }

    #[must_use]
    pub fn full_path(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.full_path,
            Self::File(file) => &file.full_path,
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }
}

/// Expanded folder paths.
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    expanded: FxHashSet<String>,
}

impl ExpansionState {
    #[must_use]
    pub fn is_expanded(&self, folder: &str) -> bool {
        self.expanded.contains(folder)
    }

    /// Flips one folder and returns its new state.
    pub fn toggle(&mut self, folder: &str) -> bool {
        if self.expanded.remove(folder) {
            false
        } else {
            self.expanded.insert(folder.to_string());
            true
        }
    }

    pub fn expand(&mut self, folder: &str) {
        self.expanded.insert(folder.to_string());
    }

    /// Forgets folders that are no longer in `tree`.
    pub fn retain_existing(&mut self, tree: &FolderTree) {
        let folders: FxHashSet<&str> = tree.folder_paths().into_iter().collect();
        self.expanded.retain(|path| folders.contains(path.as_str()));
    }
}

/// Places `file` below `folders`, creating folders in first-seen order.
fn insert_file(
    level: &mut Vec<TreeEntry>,
    folders: &[&str],
    file: FileNode,
    prefix: &str,
    expansion: &ExpansionState,
) {
    let Some((folder, rest)) = folders.split_first() else {
        level.push(TreeEntry::File(file));
        return;
    };
    let full_path = if prefix.is_empty() {
        (*folder).to_string()
    } else {
        format!("{prefix}/{folder}")
    };
    let existing = level.iter_mut().find_map(|entry| match entry {
        TreeEntry::Folder(node) if node.name == *folder => Some(node),
        _ => None,
    });
    match existing {
        Some(node) => insert_file(&mut node.children, rest, file, &full_path, expansion),
        None => {
            let mut node = FolderNode {
                name: (*folder).to_string(),
                expanded: expansion.is_expanded(&full_path),
                full_path,
                children: Vec::new(),
            };
            let prefix = node.full_path.clone();
            insert_file(&mut node.children, rest, file, &prefix, expansion);
            level.push(TreeEntry::Folder(node));
        }
    }
}

/// Hierarchical view over the open paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    roots: Vec<TreeEntry>,
}

impl FolderTree {
    /// Builds the tree for `paths`, in order.
    pub fn build<'a>(paths: impl IntoIterator<Item = &'a str>, expansion: &ExpansionState) -> Self {
        let mut roots: Vec<TreeEntry> = Vec::new();
        for path in paths {
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            let Some((file, folders)) = segments.split_last() else {
                continue;
            };
            let file = FileNode {
                name: (*file).to_string(),
                full_path: segments.join("/"),
            };
            insert_file(&mut roots, folders, file, "", expansion);
        }
        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[TreeEntry] {
        &self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Folder at `full_path`, if any.
    #[must_use]
    pub fn folder(&self, full_path: &str) -> Option<&FolderNode> {
        fn find<'a>(entries: &'a [TreeEntry], path: &str) -> Option<&'a FolderNode> {
            entries.iter().find_map(|entry| match entry {
                TreeEntry::Folder(folder) if folder.full_path == path => Some(folder),
                TreeEntry::Folder(folder) if path.starts_with(&format!("{}/", folder.full_path)) => {
                    find(&folder.children, path)
                }
                _ => None,
            })
        }
        find(&self.roots, full_path)
    }

    /// Whether a folder with this path exists.
    #[must_use]
    pub fn contains_folder(&self, full_path: &str) -> bool {
        self.folder(full_path).is_some()
    }

    /// Every folder path, depth-first.
    #[must_use]
    pub fn folder_paths(&self) -> Vec<&str> {
        fn walk<'a>(entries: &'a [TreeEntry], out: &mut Vec<&'a str>) {
            for entry in entries {
                if let TreeEntry::Folder(folder) = entry {
                    out.push(&folder.full_path);
                    walk(&folder.children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }

    /// Flips a folder in place; the caller keeps `ExpansionState` in step.
    pub fn toggle(&mut self, full_path: &str) -> Option<bool> {
        fn find_mut<'a>(entries: &'a mut [TreeEntry], path: &str) -> Option<&'a mut FolderNode> {
            for entry in entries {
                if let TreeEntry::Folder(folder) = entry {
                    if folder.full_path == path {
                        return Some(folder);
                    }
                    if path.starts_with(&format!("{}/", folder.full_path)) {
                        return find_mut(&mut folder.children, path);
                    }
                }
            }
            None
        }
        let folder = find_mut(&mut self.roots, full_path)?;
        folder.expanded = !folder.expanded;
        Some(folder.expanded)
    }

    /// Text outline; collapsed folders hide their children.
    #[must_use]
    pub fn render(&self) -> String {
        fn walk(entries: &[TreeEntry], depth: usize, out: &mut String) {
            for entry in entries {
                let indent = "  ".repeat(depth);
                match entry {
                    TreeEntry::Folder(folder) => {
                        let marker = if folder.expanded { 'v' } else { '>' };
                        let _ = writeln!(out, "{indent}{marker} {}/", folder.name);
                        if folder.expanded {
                            walk(&folder.children, depth + 1, out);
                        }
                    }
                    TreeEntry::File(file) => {
                        let _ = writeln!(out, "{indent}  {}", file.name);
                    }
                }
            }
        }
        let mut out = String::new();
        walk(&self.roots, 0, &mut out);
        out
    }
}
