//! Inline AI rectification popup state.
//!
//! The popup starts with the selected text in its code field and an empty
//! prompt. A retry sends the original selection and the prompt to the
//! rectify endpoint and replaces the code field with the answer; only one
//! retry may be in flight at a time. Validating applies the code field to
//! the original selection range.

#![allow(missing_docs)]

use tracing::{debug, warn};

use crate::buffer::BufferId;
use crate::error::{EditorError, RemoteError};
use crate::text::TextRange;

/// Tone option of the settings menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Enthusiastic,
    Informative,
    Funny,
}

/// Format option of the settings menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Paragraph,
    Email,
    Ideas,
    BlogPost,
}

/// Length option of the settings menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Length {
    #[default]
    Short,
    Medium,
    Long,
}

/// Selections of the nested settings menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectifySettings {
    pub tone: Tone,
    pub format: Format,
    pub length: Length,
}

/// Whether a rectify call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectifyPhase {
    /// Waiting for user input.
    Open,
    /// A rectify call is in flight.
    Rectifying,
}

/// The call a retry issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectifyRequest {
    pub code: String,
    pub prompt: String,
}

/// Content of the rectify popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectifyPopup {
    buffer: BufferId,
    selection: TextRange,
    original: String,
    prompt: String,
    code: String,
    phase: RectifyPhase,
    settings: RectifySettings,
}

impl RectifyPopup {
    /// Popup for `selected` text at `selection` of `buffer`.
    #[must_use]
    pub fn new(buffer: BufferId, selection: TextRange, selected: &str) -> Self {
        Self {
            buffer,
            selection,
            original: selected.to_string(),
            prompt: String::new(),
            code: selected.to_string(),
            phase: RectifyPhase::Open,
            settings: RectifySettings::default(),
        }
    }

    #[must_use]
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Range of the live editor the popup was opened for.
    #[must_use]
    pub fn selection(&self) -> TextRange {
        self.selection
    }

    /// Text selected when the popup opened.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Current content of the code field.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    #[must_use]
    pub fn phase(&self) -> RectifyPhase {
        self.phase
    }

    #[must_use]
    pub fn settings(&self) -> RectifySettings {
        self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RectifySettings {
        &mut self.settings
    }

    /// Starts a retry; fails while another one is in flight.
    pub fn begin_retry(&mut self) -> Result<RectifyRequest, EditorError> {
        if self.phase == RectifyPhase::Rectifying {
            return Err(EditorError::ConcurrentRectify);
        }
        self.phase = RectifyPhase::Rectifying;
        debug!("rectify requested with prompt {:?}", self.prompt);
        Ok(RectifyRequest {
            code: self.original.clone(),
            prompt: self.prompt.clone(),
        })
    }

    /// Resolves the in-flight retry; on success the answer replaces the code field.
    pub fn finish_retry(&mut self, result: Result<String, RemoteError>) -> Result<(), EditorError> {
        self.phase = RectifyPhase::Open;
        match result {
            Ok(rectified) => {
                self.code = rectified;
                Ok(())
            }
            Err(err) => {
                warn!("rectify failed: {err}");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteOp;
    use crate::text::Position;

    fn popup() -> RectifyPopup {
        let mut registry = crate::buffer::BufferRegistry::new();
        let id = registry.open("a.js", "var x = 1;").expect("open");
        RectifyPopup::new(
            id,
            TextRange::new(Position::new(0, 0), Position::new(0, 10)),
            "var x = 1;",
        )
    }

    #[test]
    fn opens_with_selection_and_empty_prompt() {
        let popup = popup();
        assert_eq!(popup.code(), "var x = 1;");
        assert_eq!(popup.prompt(), "");
        assert_eq!(popup.phase(), RectifyPhase::Open);
        assert_eq!(popup.settings(), RectifySettings::default());
    }

    #[test]
    fn second_retry_while_in_flight_is_rejected() {
        let mut popup = popup();
        popup.set_prompt("use const");
        let request = popup.begin_retry().expect("first retry");
        assert_eq!(request.code, "var x = 1;");
        assert_eq!(request.prompt, "use const");
        assert_eq!(popup.begin_retry(), Err(EditorError::ConcurrentRectify));

        popup.finish_retry(Ok("const x = 1;".to_string())).expect("finish");
        assert_eq!(popup.code(), "const x = 1;");
        assert_eq!(popup.phase(), RectifyPhase::Open);
        assert!(popup.begin_retry().is_ok());
    }

    #[test]
    fn failed_retry_keeps_code_and_reopens() {
        let mut popup = popup();
        popup.set_code("edited by hand");
        popup.begin_retry().expect("retry");
        let err = popup
            .finish_retry(Err(RemoteError::status(RemoteOp::Rectify, 502)))
            .expect_err("failure surfaces");
        assert!(err.is_remote());
        assert_eq!(popup.code(), "edited by hand");
        assert_eq!(popup.phase(), RectifyPhase::Open);
    }
}
