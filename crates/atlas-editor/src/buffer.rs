//! Buffers and the path-keyed buffer registry.
//!
//! The registry is the single source of truth for which files are open. It
//! never renders anything itself: every structural mutation pushes a
//! [`RegistryEvent`] that the owner drains to rebuild its projections.

#![allow(missing_docs)]

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::EditorError;
use crate::language::language_for_path;
use crate::remote::RemoteFiles;

/// Stable identity of a buffer, unchanged by renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the remote store knows about the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteState {
    /// The remote file exists (loaded from or created on the remote).
    #[default]
    Synced,
    /// The optimistic local create was not acknowledged remotely yet.
    PendingCreate,
}

/// One open file's editable content.
#[derive(Debug, Clone)]
pub struct Buffer {
    id: BufferId,
    path: String,
    language: SmolStr,
    content: String,
    dirty: bool,
    revision: u64,
    remote: RemoteState,
}

impl Buffer {
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Slash-delimited path, unique within the registry.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Language id derived from the path extension.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Edited since the last acknowledged save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Monotonic edit counter, attached to every save request.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn remote_state(&self) -> RemoteState {
        self.remote
    }

    /// File name (last path segment).
    #[must_use]
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    /// Records an observed edit and returns the new revision.
    pub(crate) fn record_edit(&mut self, content: String) -> u64 {
        self.content = content;
        self.dirty = true;
        self.revision += 1;
        self.revision
    }

    /// Clears `dirty` if `revision` is still the latest edit.
    pub(crate) fn acknowledge_save(&mut self, revision: u64) -> bool {
        if revision == self.revision {
            self.dirty = false;
        }
        !self.dirty
    }
}

/// Structural change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Opened(String),
    Renamed { from: String, to: String },
    Removed(Vec<String>),
}

/// Path-keyed owner of every open buffer.
///
/// Iteration follows insertion order; a renamed buffer moves to the end.
#[derive(Debug, Default)]
pub struct BufferRegistry {
    paths: IndexMap<String, BufferId>,
    buffers: FxHashMap<BufferId, Buffer>,
    next_id: u32,
    events: Vec<RegistryEvent>,
}

impl BufferRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new clean buffer at `path`.
    pub fn open(
        &mut self,
        path: &str,
        initial_content: impl Into<String>,
    ) -> Result<BufferId, EditorError> {
        let path = normalize_path(path)?;
        if self.is_taken(&path, &[]) {
            return Err(EditorError::DuplicatePath(path));
        }
        let id = BufferId(self.next_id);
        self.next_id += 1;
        let buffer = Buffer {
            id,
            language: language_for_path(&path),
            path: path.clone(),
            content: initial_content.into(),
            dirty: false,
            revision: 0,
            remote: RemoteState::Synced,
        };
        self.paths.insert(path.clone(), id);
        self.buffers.insert(id, buffer);
        debug!("opened buffer {id} at '{path}'");
        self.events.push(RegistryEvent::Opened(path));
        Ok(id)
    }

    /// Opens a buffer locally, then creates the file remotely.
    ///
    /// The local buffer is kept when the remote call fails; it is flagged
    /// [`RemoteState::PendingCreate`] and the failure is returned.
    pub fn create(
        &mut self,
        path: &str,
        content: impl Into<String>,
        remote: &dyn RemoteFiles,
    ) -> Result<BufferId, EditorError> {
        let id = self.open(path, content)?;
        let path = self.buffers[&id].path.clone();
        if let Err(err) = remote.create(&path) {
            warn!("remote create of '{path}' failed, keeping local buffer: {err}");
            if let Some(buffer) = self.buffers.get_mut(&id) {
                buffer.remote = RemoteState::PendingCreate;
            }
            return Err(err.into());
        }
        Ok(id)
    }

    /// Re-issues the remote create for a pending buffer.
    pub fn retry_create(&mut self, id: BufferId, remote: &dyn RemoteFiles) -> Result<(), EditorError> {
        let buffer = self
            .buffers
            .get_mut(&id)
            .ok_or_else(|| EditorError::NotFound(id.to_string()))?;
        if buffer.remote == RemoteState::Synced {
            return Ok(());
        }
        remote.create(&buffer.path)?;
        buffer.remote = RemoteState::Synced;
        Ok(())
    }

    /// Re-keys a file, or every file below a folder.
    ///
    /// The buffer ids stay the same, so holders of an id keep resolving to
    /// the same buffer. Nothing changes if any target path is taken.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), EditorError> {
        let old_path = normalize_path(old_path)?;
        let new_path = normalize_path(new_path)?;
        if old_path == new_path {
            return Ok(());
        }

        let moves: Vec<(String, String)> = if self.paths.contains_key(&old_path) {
            vec![(old_path.clone(), new_path.clone())]
        } else {
            self.paths_under(&old_path)
                .map(|path| {
                    let rest = &path[old_path.len()..];
                    (path.to_string(), format!("{new_path}{rest}"))
                })
                .collect()
        };
        if moves.is_empty() {
            return Err(EditorError::NotFound(old_path));
        }
        let sources: Vec<&str> = moves.iter().map(|(from, _)| from.as_str()).collect();
        if let Some((_, taken)) = moves.iter().find(|(_, to)| self.is_taken(to, &sources)) {
            return Err(EditorError::DuplicatePath(taken.clone()));
        }

        for (from, to) in moves {
            let Some(id) = self.paths.shift_remove(&from) else {
                continue;
            };
            if let Some(buffer) = self.buffers.get_mut(&id) {
                buffer.path.clone_from(&to);
                buffer.language = language_for_path(&to);
            }
            self.paths.insert(to.clone(), id);
            debug!("renamed buffer {id} '{from}' -> '{to}'");
            self.events.push(RegistryEvent::Renamed { from, to });
        }
        Ok(())
    }

    /// Removes a file, or every file below a folder.
    ///
    /// Folder matching is by whole path segments: removing `src` leaves
    /// `src2/app.js` alone.
    pub fn remove(&mut self, path: &str) -> Result<Vec<BufferId>, EditorError> {
        let path = normalize_path(path)?;
        let targets = self.matching(&path);
        if targets.is_empty() {
            return Err(EditorError::NotFound(path));
        }
        let mut removed = Vec::with_capacity(targets.len());
        let mut removed_paths = Vec::with_capacity(targets.len());
        for target in targets {
            if let Some(id) = self.paths.shift_remove(&target) {
                self.buffers.remove(&id);
                removed.push(id);
                removed_paths.push(target);
            }
        }
        debug!("removed {} buffer(s) under '{path}'", removed.len());
        self.events.push(RegistryEvent::Removed(removed_paths));
        Ok(removed)
    }

    /// Paths of the file at `path`, or of every file below folder `path`.
    #[must_use]
    pub fn matching(&self, path: &str) -> Vec<String> {
        let path = path.trim_end_matches('/');
        if self.paths.contains_key(path) {
            return vec![path.to_string()];
        }
        self.paths_under(path).map(str::to_string).collect()
    }

    /// Whether a file at `path` would clash with an open path other than
    /// `moving`: the same path, a file where `path` needs a folder, or files
    /// below `path`.
    #[must_use]
    pub fn is_taken(&self, path: &str, moving: &[&str]) -> bool {
        self.paths
            .keys()
            .map(String::as_str)
            .filter(|existing| !moving.contains(existing))
            .any(|existing| existing == path || is_under(existing, path) || is_under(path, existing))
    }

    fn paths_under<'a>(&'a self, folder: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.paths
            .keys()
            .map(String::as_str)
            .filter(move |path| is_under(path, folder))
    }

    #[must_use]
    pub fn get(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(&id)
    }

    #[must_use]
    pub fn by_path(&self, path: &str) -> Option<&Buffer> {
        self.paths.get(path).and_then(|id| self.buffers.get(id))
    }

    #[must_use]
    pub fn id_of(&self, path: &str) -> Option<BufferId> {
        self.paths.get(path).copied()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Open paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Buffers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.paths.values().filter_map(|id| self.buffers.get(id))
    }

    /// Most recently inserted buffer.
    #[must_use]
    pub fn last(&self) -> Option<BufferId> {
        self.paths.values().next_back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Takes the structural changes recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Whether `path` lies strictly below `folder`, compared by segments.
#[must_use]
pub fn is_under(path: &str, folder: &str) -> bool {
    path.len() > folder.len() + 1
        && path.starts_with(folder)
        && path.as_bytes()[folder.len()] == b'/'
}

/// Last segment of a path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Folder part of a path, empty at the root.
#[must_use]
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Converts backslashes, drops empty and `.` segments, rejects `..`.
pub fn normalize_path(path: &str) -> Result<String, EditorError> {
    let mut parts = Vec::new();
    for segment in path.trim().split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(EditorError::InvalidPath(format!(
                    "'{path}' escapes the project root"
                )))
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(EditorError::InvalidPath("path is required".to_string()));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRemote;

    fn registry(paths: &[&str]) -> BufferRegistry {
        let mut registry = BufferRegistry::new();
        for path in paths {
            registry.open(path, format!("// {path}")).expect("open");
        }
        registry.drain_events();
        registry
    }

    #[test]
    fn open_rejects_duplicate_paths() {
        let mut registry = registry(&["a.js"]);
        let err = registry.open("a.js", "").expect_err("duplicate");
        assert_eq!(err, EditorError::DuplicatePath("a.js".to_string()));
        assert_eq!(registry.len(), 1);
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn open_derives_language_and_starts_clean() {
        let mut registry = BufferRegistry::new();
        let id = registry.open("src\\main.py", "print()").expect("open");
        let buffer = registry.get(id).expect("buffer");
        assert_eq!(buffer.path(), "src/main.py");
        assert_eq!(buffer.language(), "python");
        assert!(!buffer.is_dirty());
        assert_eq!(
            registry.drain_events(),
            vec![RegistryEvent::Opened("src/main.py".to_string())]
        );
    }

    #[test]
    fn rename_keeps_identity_and_content() {
        let mut registry = registry(&["a.js", "b.js"]);
        let id = registry.id_of("a.js").expect("id");
        registry.rename("a.js", "a2.ts").expect("rename");
        let buffer = registry.get(id).expect("same buffer");
        assert_eq!(buffer.path(), "a2.ts");
        assert_eq!(buffer.language(), "typescript");
        assert_eq!(buffer.content(), "// a.js");
        assert!(!registry.contains("a.js"));
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["b.js", "a2.ts"]);
    }

    #[test]
    fn rename_failures_leave_state_unchanged() {
        let mut registry = registry(&["a.js", "b.js"]);
        assert_eq!(
            registry.rename("missing.js", "x.js"),
            Err(EditorError::NotFound("missing.js".to_string()))
        );
        assert_eq!(
            registry.rename("a.js", "b.js"),
            Err(EditorError::DuplicatePath("b.js".to_string()))
        );
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["a.js", "b.js"]);
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn files_and_folders_never_share_a_path() {
        let mut registry = registry(&["b/c.js", "a.js"]);
        assert_eq!(
            registry.open("b", ""),
            Err(EditorError::DuplicatePath("b".to_string()))
        );
        assert_eq!(
            registry.open("a.js/x.js", ""),
            Err(EditorError::DuplicatePath("a.js/x.js".to_string()))
        );
        assert_eq!(
            registry.rename("a.js", "b"),
            Err(EditorError::DuplicatePath("b".to_string()))
        );
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["b/c.js", "a.js"]);
        assert!(registry.drain_events().is_empty());

        registry.rename("b/c.js", "b").expect("file replaces its own folder");
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["a.js", "b"]);
    }

    #[test]
    fn rename_folder_moves_every_child() {
        let mut registry = registry(&["lib/a.js", "lib/deep/b.js", "library.js"]);
        registry.rename("lib", "src").expect("rename folder");
        assert_eq!(
            registry.paths().collect::<Vec<_>>(),
            vec!["library.js", "src/a.js", "src/deep/b.js"]
        );
    }

    #[test]
    fn remove_folder_matches_whole_segments() {
        let mut registry = registry(&["src/a.js", "src2/app.js", "src/x/y.js", "srcfile.js"]);
        let removed = registry.remove("src").expect("remove");
        assert_eq!(removed.len(), 2);
        assert_eq!(
            registry.paths().collect::<Vec<_>>(),
            vec!["src2/app.js", "srcfile.js"]
        );
        assert_eq!(
            registry.drain_events(),
            vec![RegistryEvent::Removed(vec![
                "src/a.js".to_string(),
                "src/x/y.js".to_string()
            ])]
        );
    }

    #[test]
    fn remove_missing_path_is_not_found() {
        let mut registry = registry(&["src/a.js"]);
        assert_eq!(
            registry.remove("sr"),
            Err(EditorError::NotFound("sr".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn create_keeps_optimistic_buffer_when_remote_fails() {
        let remote = FakeRemote::default();
        remote.fail_creates(true);
        let mut registry = BufferRegistry::new();
        let err = registry
            .create("newFile.js", "", &remote)
            .expect_err("remote failure surfaces");
        assert!(err.is_remote());
        let id = registry.id_of("newFile.js").expect("kept locally");
        assert_eq!(
            registry.get(id).map(Buffer::remote_state),
            Some(RemoteState::PendingCreate)
        );

        remote.fail_creates(false);
        registry.retry_create(id, &remote).expect("retry");
        assert_eq!(
            registry.get(id).map(Buffer::remote_state),
            Some(RemoteState::Synced)
        );
        assert_eq!(remote.created(), vec!["newFile.js", "newFile.js"]);
    }

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("./a//b/c.js").as_deref(), Ok("a/b/c.js"));
        assert!(normalize_path("../etc/passwd").is_err());
        assert!(normalize_path("  ").is_err());
        assert!(is_under("b/c.js", "b"));
        assert!(!is_under("b2/c.js", "b"));
        assert!(!is_under("b", "b"));
        assert_eq!(parent_path("a/b/c.js"), "a/b");
        assert_eq!(parent_path("c.js"), "");
    }
}
