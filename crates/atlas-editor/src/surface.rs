//! Editor surface abstraction and an in-memory implementation.
//!
//! The surface stands in for the rich-text widget: it shows one document at
//! a time, reports content changes to subscribed listeners and hosts the
//! completion provider registrations.

use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::text::{self, Position, TextRange};

/// Handle for a content-change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handle for a completion provider registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

/// Snapshot sent to listeners after every content mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChanged {
    /// Full document text after the mutation.
    pub content: String,
}

/// The shared editor widget.
pub trait EditorSurface {
    /// Replaces the displayed document without notifying listeners.
    fn set_document(&mut self, language: &str, content: &str);

    /// Current document text.
    fn content(&self) -> &str;

    /// Language id of the current document.
    fn language(&self) -> &str;

    /// Starts receiving [`ContentChanged`] for every later mutation.
    fn subscribe(&mut self) -> (ListenerId, Receiver<ContentChanged>);

    /// Stops a subscription; unknown ids are ignored.
    fn unsubscribe(&mut self, id: ListenerId);

    /// Number of live content subscriptions.
    fn listener_count(&self) -> usize;

    /// Replaces `range` with `text` and notifies listeners.
    fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<(), EditorError>;

    /// Current selection, possibly empty.
    fn selection(&self) -> TextRange;

    fn set_selection(&mut self, range: TextRange) -> Result<(), EditorError>;

    /// Cursor position (the selection's end).
    fn cursor(&self) -> Position {
        self.selection().end
    }

    /// Registers a completion provider for `language`.
    fn register_completion_provider(&mut self, language: &str) -> ProviderId;

    /// Disposes a registration; unknown ids are ignored.
    fn dispose_completion_provider(&mut self, id: ProviderId);

    /// Languages with a live provider, one entry per registration.
    fn completion_providers(&self) -> Vec<SmolStr>;
}

/// String-backed surface used headless and in tests.
#[derive(Debug, Default)]
pub struct TextSurface {
    content: String,
    language: SmolStr,
    selection: TextRange,
    listeners: IndexMap<ListenerId, Sender<ContentChanged>>,
    providers: IndexMap<ProviderId, SmolStr>,
    next_listener: u64,
    next_provider: u64,
}

impl TextSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&mut self) {
        let content = self.content.clone();
        self.listeners.retain(|_, tx| {
            tx.send(ContentChanged {
                content: content.clone(),
            })
            .is_ok()
        });
    }

    fn check_range(&self, range: TextRange) -> Result<(), EditorError> {
        text::text_in_range(&self.content, range)
            .map(|_| ())
            .ok_or(EditorError::InvalidRange)
    }
}

impl EditorSurface for TextSurface {
    fn set_document(&mut self, language: &str, content: &str) {
        self.language = SmolStr::new(language);
        self.content = content.to_string();
        self.selection = TextRange::default();
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn subscribe(&mut self) -> (ListenerId, Receiver<ContentChanged>) {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let (tx, rx) = unbounded();
        self.listeners.insert(id, tx);
        (id, rx)
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.shift_remove(&id);
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<(), EditorError> {
        let start = text::offset_of(&self.content, range.start).ok_or(EditorError::InvalidRange)?;
        self.content =
            text::replace_range(&self.content, range, text).ok_or(EditorError::InvalidRange)?;
        let after = text::end_position(&self.content[..start + text.len()]);
        self.selection = TextRange::caret(after);
        self.notify();
        Ok(())
    }

    fn selection(&self) -> TextRange {
        self.selection
    }

    fn set_selection(&mut self, range: TextRange) -> Result<(), EditorError> {
        self.check_range(range)?;
        self.selection = range;
        Ok(())
    }

    fn register_completion_provider(&mut self, language: &str) -> ProviderId {
        let id = ProviderId(self.next_provider);
        self.next_provider += 1;
        self.providers.insert(id, SmolStr::new(language));
        id
    }

    fn dispose_completion_provider(&mut self, id: ProviderId) {
        self.providers.shift_remove(&id);
    }

    fn completion_providers(&self) -> Vec<SmolStr> {
        self.providers.values().cloned().collect()
    }
}
