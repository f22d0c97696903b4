//! AI completion requests and per-language provider registrations.
//!
//! A provider invocation sends the text from document start to the cursor
//! to the suggestion endpoint. Every suggestion becomes one completion item
//! replacing the whole word under the cursor, so completing mid-word
//! replaces the partial word instead of inserting next to it.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{EditorError, RemoteError};
use crate::remote::{RemoteFiles, Suggestion};
use crate::surface::{EditorSurface, ProviderId};
use crate::text::{self, Position, TextRange};

/// Documentation used when a suggestion carries none.
pub const DEFAULT_DOCUMENTATION: &str = "Auto-completion suggestion";
/// Detail used when a suggestion carries none.
pub const DEFAULT_DETAIL: &str = "Suggested by AI";

/// Text edit for completion items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTextEdit {
    /// The range to replace.
    pub range: TextRange,
    /// The new text to insert.
    pub new_text: SmolStr,
}

/// A completion item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// The label shown in the completion list.
    pub label: SmolStr,
    /// Additional detail.
    pub detail: SmolStr,
    /// Documentation.
    pub documentation: SmolStr,
    /// Edit applied on accept.
    pub text_edit: CompletionTextEdit,
}

impl CompletionItem {
    /// Creates an item replacing `range` with `label`.
    pub fn new(label: impl Into<SmolStr>, range: TextRange) -> Self {
        let label = label.into();
        Self {
            text_edit: CompletionTextEdit {
                range,
                new_text: label.clone(),
            },
            label,
            detail: SmolStr::new_static(DEFAULT_DETAIL),
            documentation: SmolStr::new_static(DEFAULT_DOCUMENTATION),
        }
    }

    /// Sets the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<SmolStr>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Sets the documentation.
    #[must_use]
    pub fn with_documentation(mut self, doc: impl Into<SmolStr>) -> Self {
        self.documentation = doc.into();
        self
    }

    fn from_suggestion(suggestion: Suggestion, range: TextRange) -> Self {
        let mut item = Self::new(suggestion.text, range);
        if let Some(doc) = suggestion.documentation {
            item = item.with_documentation(doc);
        }
        if let Some(detail) = suggestion.detail {
            item = item.with_detail(detail);
        }
        item
    }
}

/// Everything a provider invocation sends and needs back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionQuery {
    pub language: SmolStr,
    /// Document text before the cursor.
    pub code: String,
    /// Word span under the cursor.
    pub range: TextRange,
}

impl CompletionQuery {
    /// Builds the query for `cursor` in `content`.
    pub fn at(content: &str, language: &str, cursor: Position) -> Result<Self, EditorError> {
        let code = text::text_until(content, cursor).ok_or(EditorError::InvalidRange)?;
        let range = text::word_range_at(content, cursor).ok_or(EditorError::InvalidRange)?;
        Ok(Self {
            language: SmolStr::new(language),
            code: code.to_string(),
            range,
        })
    }

    /// Fetches suggestions and maps them 1:1 to completion items.
    pub fn run(&self, remote: &dyn RemoteFiles) -> Result<Vec<CompletionItem>, RemoteError> {
        let suggestions = remote.suggestions(&self.language, &self.code)?;
        debug!(
            "{} completion suggestion(s) for {}",
            suggestions.len(),
            self.language
        );
        Ok(suggestions
            .into_iter()
            .map(|suggestion| CompletionItem::from_suggestion(suggestion, self.range))
            .collect())
    }
}

/// Live completion providers, at most one per language.
#[derive(Debug, Default)]
pub struct CompletionRegistry {
    providers: IndexMap<SmolStr, ProviderId>,
}

impl CompletionRegistry {
    /// Registers a provider for `language`, disposing any previous one first.
    pub fn register(&mut self, surface: &mut dyn EditorSurface, language: &str) -> ProviderId {
        if let Some(old) = self.providers.shift_remove(language) {
            surface.dispose_completion_provider(old);
        }
        let id = surface.register_completion_provider(language);
        debug!("registered completion {id} for {language}");
        self.providers.insert(SmolStr::new(language), id);
        id
    }

    /// Disposes providers whose language is not in `in_use`.
    pub fn retain_languages(&mut self, surface: &mut dyn EditorSurface, in_use: &FxHashSet<&str>) {
        self.providers.retain(|language, id| {
            let keep = in_use.contains(language.as_str());
            if !keep {
                surface.dispose_completion_provider(*id);
                debug!("disposed completion {id} for {language}");
            }
            keep
        });
    }

    /// Disposes every provider.
    pub fn clear(&mut self, surface: &mut dyn EditorSurface) {
        for (_, id) in self.providers.drain(..) {
            surface.dispose_completion_provider(id);
        }
    }

    #[must_use]
    pub fn is_registered(&self, language: &str) -> bool {
        self.providers.contains_key(language)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
