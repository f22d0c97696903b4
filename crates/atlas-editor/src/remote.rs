//! Remote file store interface and wire types.
//!
//! The project name and base model are owned by the implementation, the
//! editor core only passes paths, content and prompts.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// A file as listed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Slash-delimited path.
    pub file: String,
    /// Current content.
    #[serde(default)]
    pub code: String,
}

/// One AI completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Content save for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveContent<'a> {
    pub filename: &'a str,
    pub content: &'a str,
    /// Per-buffer edit counter; the store may ignore stale revisions.
    pub revision: u64,
}

/// Typed access to the backend file and AI endpoints.
///
/// Calls block until the remote answers. Implementations must be shareable
/// with the background save worker.
pub trait RemoteFiles: Send + Sync {
    fn list_files(&self) -> Result<Vec<RemoteFile>, RemoteError>;

    fn create(&self, filename: &str) -> Result<Value, RemoteError>;

    fn rename(&self, old_name: &str, new_name: &str) -> Result<Value, RemoteError>;

    fn delete(&self, filename: &str) -> Result<Value, RemoteError>;

    fn save(&self, save: &SaveContent<'_>) -> Result<(), RemoteError>;

    /// Suggestions for `code`, the text from document start to the cursor.
    fn suggestions(&self, language: &str, code: &str) -> Result<Vec<Suggestion>, RemoteError>;

    /// Rewritten version of `code`, steered by an optional `prompt`.
    fn rectify(&self, code: &str, prompt: &str) -> Result<String, RemoteError>;
}
