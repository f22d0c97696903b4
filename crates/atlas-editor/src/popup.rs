//! Transient popup layer.
//!
//! At most one primary popup is live. Opening a popup supersedes whatever
//! was open. While a popup is open an outside-pointer listener is attached;
//! a pointer-down outside the popup closes it and detaches the listener. A
//! primary popup may host one nested popup (the rectify settings menu),
//! toggled by a plain presence check.

#![allow(missing_docs)]

use std::fmt;

use tracing::debug;

use crate::error::EditorError;
use crate::rectify::RectifyPopup;

/// Identity of one opened popup; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(u64);

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popup#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    Rectify,
    FileVisualizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedKind {
    Settings,
}

/// Dialog listing every open path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVisualizer {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupContent {
    Rectify(RectifyPopup),
    FileVisualizer(FileVisualizer),
}

impl PopupContent {
    #[must_use]
    pub fn kind(&self) -> PopupKind {
        match self {
            Self::Rectify(_) => PopupKind::Rectify,
            Self::FileVisualizer(_) => PopupKind::FileVisualizer,
        }
    }
}

/// Where a pointer-down landed, as hit-tested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Inside the root element of this popup (nested popups included).
    Inside(PopupId),
    /// Anywhere else in the document.
    Outside,
}

#[derive(Debug)]
struct OpenPopup {
    id: PopupId,
    content: PopupContent,
    nested: Option<NestedKind>,
}

/// Owner of the popup layer for one editor session.
#[derive(Debug, Default)]
pub struct PopupCoordinator {
    open: Option<OpenPopup>,
    next_id: u64,
}

impl PopupCoordinator {
    /// Shows `content`, closing the current popup first.
    pub fn open(&mut self, content: PopupContent) -> PopupId {
        if let Some(previous) = self.open.take() {
            debug!(
                "{} ({:?}) superseded by {:?}",
                previous.id,
                previous.content.kind(),
                content.kind()
            );
        }
        let id = PopupId(self.next_id);
        self.next_id += 1;
        debug!("opened {id} ({:?})", content.kind());
        self.open = Some(OpenPopup {
            id,
            content,
            nested: None,
        });
        id
    }

    /// Removes popup `id`; returns its content, or `None` if already gone.
    pub fn close(&mut self, id: PopupId) -> Option<PopupContent> {
        if self.current() != Some(id) {
            return None;
        }
        let popup = self.open.take()?;
        debug!("closed {id}");
        Some(popup.content)
    }

    /// Routes a document pointer-down; returns the popup it closed.
    pub fn pointer_down(&mut self, target: PointerTarget) -> Option<PopupId> {
        let current = self.current()?;
        match target {
            PointerTarget::Inside(id) if id == current => None,
            _ => {
                self.close(current);
                Some(current)
            }
        }
    }

    /// Attaches the nested popup if absent, removes it otherwise.
    ///
    /// Returns whether it is present afterwards.
    pub fn toggle_nested(&mut self, parent: PopupId, kind: NestedKind) -> Result<bool, EditorError> {
        let popup = self
            .open
            .as_mut()
            .filter(|popup| popup.id == parent)
            .ok_or(EditorError::PopupNotOpen(parent))?;
        popup.nested = match popup.nested {
            Some(_) => None,
            None => Some(kind),
        };
        Ok(popup.nested.is_some())
    }

    #[must_use]
    pub fn nested(&self, parent: PopupId) -> Option<NestedKind> {
        self.open
            .as_ref()
            .filter(|popup| popup.id == parent)
            .and_then(|popup| popup.nested)
    }

    #[must_use]
    pub fn current(&self) -> Option<PopupId> {
        self.open.as_ref().map(|popup| popup.id)
    }

    #[must_use]
    pub fn is_open(&self, id: PopupId) -> bool {
        self.current() == Some(id)
    }

    #[must_use]
    pub fn content(&self) -> Option<&PopupContent> {
        self.open.as_ref().map(|popup| &popup.content)
    }

    /// Open rectify popup and its id.
    #[must_use]
    pub fn rectify(&self) -> Option<(PopupId, &RectifyPopup)> {
        match &self.open {
            Some(OpenPopup {
                id,
                content: PopupContent::Rectify(popup),
                ..
            }) => Some((*id, popup)),
            _ => None,
        }
    }

    pub fn rectify_mut(&mut self) -> Option<&mut RectifyPopup> {
        match &mut self.open {
            Some(OpenPopup {
                content: PopupContent::Rectify(popup),
                ..
            }) => Some(popup),
            _ => None,
        }
    }

    /// Number of attached outside-pointer listeners (0 or 1).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        usize::from(self.open.is_some())
    }
}
