//! In-memory remote store for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{RemoteError, RemoteOp};
use crate::remote::{RemoteFile, RemoteFiles, SaveContent, Suggestion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    Rename(String, String),
    Delete(String),
    Save(String, String, u64),
    Suggestions(String, String),
    Rectify(String, String),
}

#[derive(Debug, Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<Call>>,
    files: Mutex<Vec<RemoteFile>>,
    suggestions: Mutex<Vec<Suggestion>>,
    rectified: Mutex<String>,
    fail_creates: AtomicBool,
    fail_renames: AtomicBool,
    fail_deletes: AtomicBool,
    fail_saves: AtomicBool,
}

impl FakeRemote {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let remote = Self::default();
        *remote.files.lock() = files
            .iter()
            .map(|(file, code)| RemoteFile {
                file: (*file).to_string(),
                code: (*code).to_string(),
            })
            .collect();
        remote
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_suggestions(&self, suggestions: Vec<Suggestion>) {
        *self.suggestions.lock() = suggestions;
    }

    pub fn set_rectified(&self, text: &str) {
        *self.rectified.lock() = text.to_string();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn saves(&self) -> Vec<(String, String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Save(path, content, revision) => Some((path, content, revision)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check(flag: &AtomicBool, op: RemoteOp) -> Result<(), RemoteError> {
        if flag.load(Ordering::SeqCst) {
            Err(RemoteError::status(op, 500))
        } else {
            Ok(())
        }
    }
}

impl RemoteFiles for FakeRemote {
    fn list_files(&self) -> Result<Vec<RemoteFile>, RemoteError> {
        self.record(Call::List);
        Ok(self.files.lock().clone())
    }

    fn create(&self, filename: &str) -> Result<Value, RemoteError> {
        self.record(Call::Create(filename.to_string()));
        Self::check(&self.fail_creates, RemoteOp::Create)?;
        Ok(json!({ "file": filename }))
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<Value, RemoteError> {
        self.record(Call::Rename(old_name.to_string(), new_name.to_string()));
        Self::check(&self.fail_renames, RemoteOp::Rename)?;
        Ok(json!({ "file": new_name }))
    }

    fn delete(&self, filename: &str) -> Result<Value, RemoteError> {
        self.record(Call::Delete(filename.to_string()));
        Self::check(&self.fail_deletes, RemoteOp::Delete)?;
        Ok(json!({ "ok": true }))
    }

    fn save(&self, save: &SaveContent<'_>) -> Result<(), RemoteError> {
        self.record(Call::Save(
            save.filename.to_string(),
            save.content.to_string(),
            save.revision,
        ));
        Self::check(&self.fail_saves, RemoteOp::Save)
    }

    fn suggestions(&self, language: &str, code: &str) -> Result<Vec<Suggestion>, RemoteError> {
        self.record(Call::Suggestions(language.to_string(), code.to_string()));
        Ok(self.suggestions.lock().clone())
    }

    fn rectify(&self, code: &str, prompt: &str) -> Result<String, RemoteError> {
        self.record(Call::Rectify(code.to_string(), prompt.to_string()));
        Ok(self.rectified.lock().clone())
    }
}
