//! Tab strip projection: one tab per open buffer, at most one active.

#![allow(missing_docs)]

use crate::buffer::{BufferId, BufferRegistry};
use crate::error::EditorError;

/// One tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub buffer: BufferId,
    /// File name shown on the tab.
    pub title: String,
    pub active: bool,
}

/// Tabs in registry order.
///
/// Exactly one tab is active whenever at least one buffer is open. When the
/// active buffer disappears the most recently opened buffer takes over.
#[derive(Debug, Clone, Default)]
pub struct TabStrip {
    tabs: Vec<Tab>,
}

impl TabStrip {
    /// Re-renders from the registry, keeping `active` when it still exists.
    ///
    /// Returns the buffer that ends up active.
    pub fn rebuild(&mut self, registry: &BufferRegistry, active: Option<BufferId>) -> Option<BufferId> {
        let active = active
            .filter(|id| registry.get(*id).is_some())
            .or_else(|| registry.last());
        self.tabs = registry
            .iter()
            .map(|buffer| Tab {
                buffer: buffer.id(),
                title: buffer.name().to_string(),
                active: Some(buffer.id()) == active,
            })
            .collect();
        active
    }

    /// Marks `buffer`'s tab active.
    pub fn activate(&mut self, buffer: BufferId) -> Result<(), EditorError> {
        if !self.tabs.iter().any(|tab| tab.buffer == buffer) {
            return Err(EditorError::NotFound(buffer.to_string()));
        }
        for tab in &mut self.tabs {
            tab.active = tab.buffer == buffer;
        }
        Ok(())
    }

    #[must_use]
    pub fn active(&self) -> Option<BufferId> {
        self.tabs.iter().find(|tab| tab.active).map(|tab| tab.buffer)
    }

    #[must_use]
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
