//! Workbench tying registry, projections and session together.
//!
//! Every structural change goes through the workbench, which then rebuilds
//! the folder tree and the tab strip, keeps exactly one tab active and
//! rebinds the editor session to it. Local precondition failures leave all
//! state unchanged; remote failures are logged and returned.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::buffer::{self, BufferId, BufferRegistry, RegistryEvent, RemoteState};
use crate::completion::CompletionItem;
use crate::error::EditorError;
use crate::language::PLAINTEXT;
use crate::popup::{FileVisualizer, PointerTarget, PopupContent, PopupId, PopupKind};
use crate::remote::RemoteFiles;
use crate::save::{SaveQueue, SaveRequest};
use crate::session::EditorSession;
use crate::surface::EditorSurface;
use crate::tabs::TabStrip;
use crate::text::{Position, TextRange};
use crate::tree::{ExpansionState, FolderTree};

/// Name given to files created from the sidebar.
pub const NEW_FILE_NAME: &str = "newFile.js";

/// Workbench tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbenchOptions {
    /// Register AI completion providers.
    pub autocompletion: bool,
    /// Trailing window over which a buffer's saves are coalesced.
    pub save_debounce: Duration,
}

impl Default for WorkbenchOptions {
    fn default() -> Self {
        Self {
            autocompletion: true,
            save_debounce: Duration::from_millis(250),
        }
    }
}

/// Headless editor workbench.
pub struct Workbench<S: EditorSurface> {
    registry: BufferRegistry,
    expansion: ExpansionState,
    tree: FolderTree,
    tabs: TabStrip,
    session: EditorSession<S>,
    saves: SaveQueue,
    remote: Arc<dyn RemoteFiles>,
    renaming: Option<String>,
}

impl<S: EditorSurface> Workbench<S> {
    /// Creates an empty workbench and starts its save worker.
    pub fn new(
        surface: S,
        remote: Arc<dyn RemoteFiles>,
        options: WorkbenchOptions,
    ) -> std::io::Result<Self> {
        let saves = SaveQueue::spawn(Arc::clone(&remote), options.save_debounce)?;
        Ok(Self {
            registry: BufferRegistry::new(),
            expansion: ExpansionState::default(),
            tree: FolderTree::default(),
            tabs: TabStrip::default(),
            session: EditorSession::new(surface, options.autocompletion),
            saves,
            remote,
            renaming: None,
        })
    }

    /// Opens every remote file of the project; the last one becomes active.
    ///
    /// Paths already open are skipped. Returns the number of opened files.
    pub fn load_project(&mut self) -> Result<usize, EditorError> {
        let files = self.remote.list_files().map_err(|err| {
            warn!("listing project files failed: {err}");
            EditorError::from(err)
        })?;
        let mut last = None;
        let mut opened = 0;
        for file in files {
            match self.registry.open(&file.file, file.code) {
                Ok(id) => {
                    last = Some(id);
                    opened += 1;
                }
                Err(err) => warn!("skipping listed file '{}': {err}", file.file),
            }
        }
        info!("loaded {opened} project file(s)");
        self.refresh(last);
        Ok(opened)
    }

    /// Opens a local buffer without touching the remote store.
    pub fn open(&mut self, path: &str, content: impl Into<String>) -> Result<BufferId, EditorError> {
        let id = self.registry.open(path, content)?;
        self.refresh(Some(id));
        Ok(id)
    }

    /// Re-renders the projections after structural changes.
    ///
    /// `preferred` becomes active when it exists; otherwise the current
    /// active buffer stays, falling back to the most recently opened one.
    pub fn refresh(&mut self, preferred: Option<BufferId>) -> Vec<RegistryEvent> {
        self.session.sync(&mut self.registry, &self.saves);
        let events = self.registry.drain_events();
        if !events.is_empty() {
            debug!("{} structural change(s), re-rendering", events.len());
        }

        self.tree = FolderTree::build(self.registry.paths(), &self.expansion);
        self.expansion.retain_existing(&self.tree);

        let current = preferred
            .filter(|id| self.registry.get(*id).is_some())
            .or_else(|| self.tabs.active());
        match self.tabs.rebuild(&self.registry, current) {
            Some(active) => {
                if let Err(err) = self.session.bind(&mut self.registry, &self.saves, active) {
                    warn!("binding buffer {active} failed: {err}");
                }
            }
            None => {
                self.session.unbind(&mut self.registry, &self.saves);
                self.session.surface_mut().set_document(PLAINTEXT, "");
            }
        }
        self.session.sync_providers(&self.registry);
        events
    }

    /// Makes `id` the active buffer.
    pub fn activate(&mut self, id: BufferId) -> Result<(), EditorError> {
        if self.registry.get(id).is_none() {
            return Err(EditorError::NotFound(id.to_string()));
        }
        self.session.sync(&mut self.registry, &self.saves);
        self.tabs.activate(id)?;
        self.session.bind(&mut self.registry, &self.saves, id)
    }

    /// Activates the buffer at `path`.
    pub fn open_path(&mut self, path: &str) -> Result<BufferId, EditorError> {
        let path = buffer::normalize_path(path)?;
        let id = self
            .registry
            .id_of(&path)
            .ok_or(EditorError::NotFound(path))?;
        self.activate(id)?;
        Ok(id)
    }

    /// Edits the active buffer through the surface and applies the change.
    pub fn edit(&mut self, range: TextRange, text: &str) -> Result<(), EditorError> {
        self.session.edit(range, text)?;
        self.session.sync(&mut self.registry, &self.saves);
        Ok(())
    }

    /// Applies edits observed on the surface; returns how many.
    pub fn sync(&mut self) -> usize {
        self.session.sync(&mut self.registry, &self.saves)
    }

    /// Sends every pending save and folds the outcomes back.
    pub fn flush(&mut self) {
        self.session.sync(&mut self.registry, &self.saves);
        self.saves.flush();
        self.session.sync(&mut self.registry, &self.saves);
    }

    /// Selects a range of the active buffer, possibly opening the rectify popup.
    pub fn select(&mut self, range: TextRange) -> Result<Option<PopupId>, EditorError> {
        self.session.select(range)
    }

    /// AI completion items at `cursor` of the active buffer.
    pub fn complete(&mut self, cursor: Position) -> Result<Vec<CompletionItem>, EditorError> {
        self.session.sync(&mut self.registry, &self.saves);
        self.session
            .complete(&self.registry, self.remote.as_ref(), cursor)
            .map_err(|err| {
                if err.is_remote() {
                    warn!("completion request failed: {err}");
                }
                err
            })
    }

    pub fn set_rectify_prompt(&mut self, prompt: &str) -> Result<(), EditorError> {
        self.session
            .rectify_popup_mut()
            .ok_or(EditorError::NoRectifyPopup)?
            .set_prompt(prompt);
        Ok(())
    }

    /// Sends the open rectify popup's selection to the AI and shows the answer.
    pub fn retry_rectify(&mut self) -> Result<(), EditorError> {
        self.session.retry_rectify(self.remote.as_ref())
    }

    /// Applies the rectified code to the original selection.
    pub fn validate_rectify(&mut self) -> Result<(), EditorError> {
        self.session.validate_rectify()?;
        self.session.sync(&mut self.registry, &self.saves);
        Ok(())
    }

    /// Discards the rectify popup; returns whether one was open.
    pub fn close_rectify(&mut self) -> bool {
        let current = self.session.popups().current();
        match current {
            Some(id) if self.session.popups().rectify().is_some() => {
                self.session.popups_mut().close(id).is_some()
            }
            _ => false,
        }
    }

    pub fn toggle_rectify_settings(&mut self) -> Result<bool, EditorError> {
        self.session.toggle_rectify_settings()
    }

    /// Routes a document pointer-down to the popup layer.
    pub fn pointer_down(&mut self, target: PointerTarget) -> Option<PopupId> {
        self.session.pointer_down(target)
    }

    pub fn set_autocompletion(&mut self, enabled: bool) {
        self.session.set_autocompletion(enabled, &self.registry);
    }

    /// Creates a file with a fresh default name; it becomes active.
    ///
    /// The buffer is inserted before the remote call. When that call fails
    /// the buffer stays, flagged [`RemoteState::PendingCreate`], and the
    /// failure is returned.
    pub fn create_file(&mut self) -> Result<BufferId, EditorError> {
        let name = self.unique_new_file_name();
        let result = self.registry.create(&name, "", self.remote.as_ref());
        let opened = self.registry.id_of(&name);
        self.refresh(opened);
        result
    }

    fn unique_new_file_name(&self) -> String {
        if !self.registry.is_taken(NEW_FILE_NAME, &[]) {
            return NEW_FILE_NAME.to_string();
        }
        let (stem, extension) = NEW_FILE_NAME
            .rsplit_once('.')
            .unwrap_or((NEW_FILE_NAME, "js"));
        (1..)
            .map(|n| format!("{stem}-{n}.{extension}"))
            .find(|name| !self.registry.is_taken(name, &[]))
            .unwrap_or_else(|| NEW_FILE_NAME.to_string())
    }

    /// Re-issues the remote create of every pending buffer.
    ///
    /// Returns how many are synced now; failures are logged.
    pub fn retry_pending_creates(&mut self) -> usize {
        let pending: Vec<BufferId> = self
            .registry
            .iter()
            .filter(|buffer| buffer.remote_state() == RemoteState::PendingCreate)
            .map(|buffer| buffer.id())
            .collect();
        let mut synced = 0;
        for id in pending {
            match self.registry.retry_create(id, self.remote.as_ref()) {
                Ok(()) => synced += 1,
                Err(err) => warn!("create retry for buffer {id} failed: {err}"),
            }
        }
        synced
    }

    /// Renames a file, or every file below a folder, remotely then locally.
    ///
    /// Target collisions are rejected before any remote call. Files are
    /// moved one by one; the first remote failure stops the move.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), EditorError> {
        let old_path = buffer::normalize_path(old_path)?;
        let new_path = buffer::normalize_path(new_path)?;
        if old_path == new_path {
            return Ok(());
        }
        let moves: Vec<(String, String)> = self
            .registry
            .matching(&old_path)
            .into_iter()
            .map(|from| {
                let to = format!("{new_path}{}", &from[old_path.len()..]);
                (from, to)
            })
            .collect();
        if moves.is_empty() {
            return Err(EditorError::NotFound(old_path));
        }
        let sources: Vec<&str> = moves.iter().map(|(from, _)| from.as_str()).collect();
        let taken = moves
            .iter()
            .find(|(_, to)| self.registry.is_taken(to, &sources));
        if let Some((_, taken)) = taken {
            return Err(EditorError::DuplicatePath(taken.clone()));
        }

        // Pending saves still carry the old paths.
        self.flush();
        let mut result = Ok(());
        for (from, to) in moves {
            if let Err(err) = self.remote.rename(&from, &to) {
                warn!("remote rename '{from}' -> '{to}' failed: {err}");
                result = Err(err.into());
                break;
            }
            if let Err(err) = self.registry.rename(&from, &to) {
                result = Err(err);
                break;
            }
        }
        if result.is_ok() && self.expansion.is_expanded(&old_path) {
            self.expansion.expand(&new_path);
        }
        self.refresh(None);
        result
    }

    /// Deletes a file, or every file below a folder, remotely then locally.
    ///
    /// Each file is removed locally as soon as its remote delete succeeds;
    /// the first remote failure stops the deletion. A file whose remote
    /// delete failed keeps its unsaved content queued for saving.
    pub fn delete(&mut self, path: &str) -> Result<(), EditorError> {
        let path = buffer::normalize_path(path)?;
        let targets = self.registry.matching(&path);
        if targets.is_empty() {
            return Err(EditorError::NotFound(path));
        }
        self.session.sync(&mut self.registry, &self.saves);
        let mut result = Ok(());
        for target in targets {
            let id = self.registry.id_of(&target);
            if let Some(id) = id {
                self.saves.cancel(id);
            }
            if let Err(err) = self.remote.delete(&target) {
                warn!("remote delete of '{target}' failed: {err}");
                if let Some(id) = id {
                    self.requeue_save(id);
                }
                result = Err(err.into());
                break;
            }
            if let Err(err) = self.registry.remove(&target) {
                result = Err(err);
                break;
            }
        }
        self.refresh(None);
        result
    }

    fn requeue_save(&self, id: BufferId) {
        let Some(buffer) = self.registry.get(id).filter(|buffer| buffer.is_dirty()) else {
            return;
        };
        debug!("requeueing save r{} for '{}'", buffer.revision(), buffer.path());
        self.saves.schedule(SaveRequest {
            buffer: id,
            path: buffer.path().to_string(),
            content: buffer.content().to_string(),
            revision: buffer.revision(),
        });
    }

    /// Flips a folder's expansion; returns the new state.
    pub fn toggle_expand(&mut self, folder: &str) -> Result<bool, EditorError> {
        let folder = folder.trim_end_matches('/');
        let expanded = self
            .tree
            .toggle(folder)
            .ok_or_else(|| EditorError::NotFound(folder.to_string()))?;
        if expanded != self.expansion.is_expanded(folder) {
            self.expansion.toggle(folder);
        }
        Ok(expanded)
    }

    /// Expands every folder.
    pub fn expand_all(&mut self) {
        for folder in self.tree.folder_paths() {
            self.expansion.expand(folder);
        }
        self.tree = FolderTree::build(self.registry.paths(), &self.expansion);
    }

    /// Starts an inline rename of `path`.
    pub fn begin_rename(&mut self, path: &str) -> Result<(), EditorError> {
        let path = buffer::normalize_path(path)?;
        if self.registry.matching(&path).is_empty() {
            return Err(EditorError::NotFound(path));
        }
        self.renaming = Some(path);
        Ok(())
    }

    /// Path whose name is being edited, if any.
    pub fn renaming(&self) -> Option<&str> {
        self.renaming.as_deref()
    }

    /// Ends the inline rename of `path` with the edited name.
    ///
    /// A blank or unchanged name ends the edit without renaming.
    pub fn commit_rename(&mut self, path: &str, new_name: &str) -> Result<(), EditorError> {
        self.renaming = None;
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == buffer::file_name(path) {
            return Ok(());
        }
        if new_name.contains(['/', '\\']) {
            return Err(EditorError::InvalidPath(format!(
                "'{new_name}' is not a single name"
            )));
        }
        let parent = buffer::parent_path(path);
        let new_path = if parent.is_empty() {
            new_name.to_string()
        } else {
            format!("{parent}/{new_name}")
        };
        self.rename(path, &new_path)
    }

    pub fn cancel_rename(&mut self) {
        self.renaming = None;
    }

    /// Shows the dialog listing every open path.
    pub fn visualize(&mut self) -> PopupId {
        let files = self.registry.paths().map(str::to_string).collect();
        self.session
            .popups_mut()
            .open(PopupContent::FileVisualizer(FileVisualizer { files }))
    }

    /// Opens `path` from the file visualizer and closes it.
    pub fn pick_visualized(&mut self, path: &str) -> Result<BufferId, EditorError> {
        let popups = self.session.popups();
        let visualizer = popups
            .current()
            .filter(|_| popups.content().map(PopupContent::kind) == Some(PopupKind::FileVisualizer));
        if let Some(id) = visualizer {
            self.session.popups_mut().close(id);
        }
        self.open_path(path)
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn tabs(&self) -> &TabStrip {
        &self.tabs
    }

    pub fn session(&self) -> &EditorSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession<S> {
        &mut self.session
    }

    pub fn remote(&self) -> &Arc<dyn RemoteFiles> {
        &self.remote
    }

    /// The buffer shown on the surface.
    pub fn active(&self) -> Option<BufferId> {
        self.session.bound()
    }

    pub fn active_buffer(&self) -> Option<&buffer::Buffer> {
        self.active().and_then(|id| self.registry.get(id))
    }
}
