//! Sidebar command dispatch.
//!
//! Clicks on the rendered folder tree are hit-tested by the host into a
//! [`NodeRegion`]; [`SidebarAction::for_node`] maps each click to exactly one
//! action and [`Workbench::dispatch`] handles it.

use tracing::warn;

use crate::error::EditorError;
use crate::surface::EditorSurface;
use crate::tree::TreeEntry;
use crate::workbench::Workbench;

/// Part of a sidebar row that received a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRegion {
    /// Icon and name.
    Name,
    /// Rename action button.
    RenameIcon,
    /// Delete action button.
    DeleteIcon,
}

/// Everything the sidebar can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    /// Show a file in the editor.
    Open(String),
    /// Turn a row's name into an editable field.
    BeginRename(String),
    /// The edited name lost focus.
    CommitRename {
        /// Row being renamed.
        path: String,
        /// Edited last segment.
        new_name: String,
    },
    /// Leave the editable field without renaming.
    CancelRename,
    /// Delete a file or a whole folder.
    Delete(String),
    /// Create a file with a default name.
    Create,
    /// Expand or collapse a folder.
    ToggleExpand(String),
    /// Open the file visualizer dialog.
    Visualize,
    /// Pick a file in the visualizer dialog.
    PickVisualized(String),
}

impl SidebarAction {
    /// The single action a click on `region` of `entry` triggers.
    ///
    /// Action icons never reach the folder toggle.
    #[must_use]
    pub fn for_node(entry: &TreeEntry, region: NodeRegion) -> Self {
        let path = entry.full_path().to_string();
        match (region, entry) {
            (NodeRegion::Name, TreeEntry::Folder(_)) => Self::ToggleExpand(path),
            (NodeRegion::Name, TreeEntry::File(_)) => Self::Open(path),
            (NodeRegion::RenameIcon, _) => Self::BeginRename(path),
            (NodeRegion::DeleteIcon, _) => Self::Delete(path),
        }
    }
}

impl<S: EditorSurface> Workbench<S> {
    /// Handles one sidebar action.
    ///
    /// Failures are logged and returned; local failures change nothing.
    pub fn dispatch(&mut self, action: SidebarAction) -> Result<(), EditorError> {
        let result = match &action {
            SidebarAction::Open(path) => self.open_path(path).map(drop),
            SidebarAction::PickVisualized(path) => self.pick_visualized(path).map(drop),
            SidebarAction::BeginRename(path) => self.begin_rename(path),
            SidebarAction::CommitRename { path, new_name } => self.commit_rename(path, new_name),
            SidebarAction::CancelRename => {
                self.cancel_rename();
                Ok(())
            }
            SidebarAction::Delete(path) => self.delete(path),
            SidebarAction::Create => self.create_file().map(drop),
            SidebarAction::ToggleExpand(path) => self.toggle_expand(path).map(drop),
            SidebarAction::Visualize => {
                self.visualize();
                Ok(())
            }
        };
        if let Err(err) = &result {
            warn!("sidebar action {action:?} failed: {err}");
        }
        result
    }
}
