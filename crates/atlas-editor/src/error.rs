//! Editor errors.

use std::fmt;

use thiserror::Error;

use crate::popup::PopupId;

/// Remote file store operation, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// List project files.
    List,
    /// Create a file.
    Create,
    /// Rename a file or folder.
    Rename,
    /// Delete a file.
    Delete,
    /// Save file content.
    Save,
    /// Fetch completion suggestions.
    Suggestions,
    /// Rectify a code span.
    Rectify,
}

impl RemoteOp {
    /// Short name used in log lines and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Rename => "rename",
            Self::Delete => "delete",
            Self::Save => "save",
            Self::Suggestions => "suggestions",
            Self::Rectify => "rectify",
        }
    }
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a remote call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The server answered with a non-success status.
    Status(u16),
    /// The request never produced a response.
    Transport(String),
    /// The response body could not be decoded.
    Decode(String),
}

/// A failed call against the remote file store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote {op} failed: {kind}")]
pub struct RemoteError {
    /// Operation that failed.
    pub op: RemoteOp,
    /// Failure detail.
    pub kind: RemoteErrorKind,
}

impl RemoteError {
    /// Non-success status answer.
    #[must_use]
    pub fn status(op: RemoteOp, status: u16) -> Self {
        Self {
            op,
            kind: RemoteErrorKind::Status(status),
        }
    }

    /// Transport-level failure.
    pub fn transport(op: RemoteOp, message: impl Into<String>) -> Self {
        Self {
            op,
            kind: RemoteErrorKind::Transport(message.into()),
        }
    }

    /// Undecodable response.
    pub fn decode(op: RemoteOp, message: impl Into<String>) -> Self {
        Self {
            op,
            kind: RemoteErrorKind::Decode(message.into()),
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status {status}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Decode(message) => write!(f, "invalid response: {message}"),
        }
    }
}

/// Errors raised by the editor core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// No buffer (or folder) with this path.
    #[error("no open file or folder at '{0}'")]
    NotFound(String),

    /// A buffer already exists at this path.
    #[error("a file already exists at '{0}'")]
    DuplicatePath(String),

    /// The path cannot name a buffer.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A remote call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A rectify call is already in flight for the open popup.
    #[error("a rectify request is already in flight")]
    ConcurrentRectify,

    /// The operation needs a bound buffer.
    #[error("no active buffer")]
    NoActiveBuffer,

    /// The operation needs an open rectify popup.
    #[error("no rectify popup is open")]
    NoRectifyPopup,

    /// The popup was already closed or superseded.
    #[error("popup {0} is not open")]
    PopupNotOpen(PopupId),

    /// The range lies outside the current text.
    #[error("range is outside the document")]
    InvalidRange,
}

impl EditorError {
    /// Whether the error came from the remote store rather than a local precondition.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
