#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use atlas_editor::remote::{RemoteFile, RemoteFiles, SaveContent, Suggestion};
use atlas_editor::{RemoteError, RemoteOp, TextSurface, Workbench, WorkbenchOptions};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Request recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Create(String),
    Rename(String, String),
    Delete(String),
    Save { path: String, content: String, revision: u64 },
    Suggestions { language: String, code: String },
    Rectify { code: String, prompt: String },
}

/// Remote store keeping files in memory, failing on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<Vec<RemoteFile>>,
    requests: Mutex<Vec<Request>>,
    suggestions: Mutex<Vec<Suggestion>>,
    rectified: Mutex<String>,
    failing: Mutex<Vec<RemoteOp>>,
}

impl MemoryStore {
    pub fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        *store.files.lock() = files
            .iter()
            .map(|(file, code)| RemoteFile {
                file: (*file).to_string(),
                code: (*code).to_string(),
            })
            .collect();
        Arc::new(store)
    }

    pub fn fail(&self, op: RemoteOp) {
        self.failing.lock().push(op);
    }

    pub fn recover(&self) {
        self.failing.lock().clear();
    }

    pub fn set_suggestions(&self, texts: &[&str]) {
        *self.suggestions.lock() = texts
            .iter()
            .map(|text| Suggestion {
                text: (*text).to_string(),
                documentation: None,
                detail: None,
            })
            .collect();
    }

    pub fn set_rectified(&self, code: &str) {
        *self.rectified.lock() = code.to_string();
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Content of `path` as the store last saw it.
    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .iter()
            .find(|file| file.file == path)
            .map(|file| file.code.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().iter().map(|file| file.file.clone()).collect()
    }

    fn check(&self, op: RemoteOp) -> Result<(), RemoteError> {
        if self.failing.lock().contains(&op) {
            return Err(RemoteError::status(op, 500));
        }
        Ok(())
    }
}

impl RemoteFiles for MemoryStore {
    fn list_files(&self) -> Result<Vec<RemoteFile>, RemoteError> {
        self.check(RemoteOp::List)?;
        Ok(self.files.lock().clone())
    }

    fn create(&self, filename: &str) -> Result<Value, RemoteError> {
        self.requests.lock().push(Request::Create(filename.to_string()));
        self.check(RemoteOp::Create)?;
        self.files.lock().push(RemoteFile {
            file: filename.to_string(),
            code: String::new(),
        });
        Ok(json!({ "file": filename }))
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<Value, RemoteError> {
        self.requests
            .lock()
            .push(Request::Rename(old_name.to_string(), new_name.to_string()));
        self.check(RemoteOp::Rename)?;
        for file in self.files.lock().iter_mut() {
            if file.file == old_name {
                file.file = new_name.to_string();
            }
        }
        Ok(json!({ "file": new_name }))
    }

    fn delete(&self, filename: &str) -> Result<Value, RemoteError> {
        self.requests.lock().push(Request::Delete(filename.to_string()));
        self.check(RemoteOp::Delete)?;
        self.files.lock().retain(|file| file.file != filename);
        Ok(json!({ "deleted": filename }))
    }

    fn save(&self, save: &SaveContent<'_>) -> Result<(), RemoteError> {
        self.requests.lock().push(Request::Save {
            path: save.filename.to_string(),
            content: save.content.to_string(),
            revision: save.revision,
        });
        self.check(RemoteOp::Save)?;
        let mut files = self.files.lock();
        match files.iter_mut().find(|file| file.file == save.filename) {
            Some(file) => file.code = save.content.to_string(),
            None => files.push(RemoteFile {
                file: save.filename.to_string(),
                code: save.content.to_string(),
            }),
        }
        Ok(())
    }

    fn suggestions(&self, language: &str, code: &str) -> Result<Vec<Suggestion>, RemoteError> {
        self.requests.lock().push(Request::Suggestions {
            language: language.to_string(),
            code: code.to_string(),
        });
        self.check(RemoteOp::Suggestions)?;
        Ok(self.suggestions.lock().clone())
    }

    fn rectify(&self, code: &str, prompt: &str) -> Result<String, RemoteError> {
        self.requests.lock().push(Request::Rectify {
            code: code.to_string(),
            prompt: prompt.to_string(),
        });
        self.check(RemoteOp::Rectify)?;
        Ok(self.rectified.lock().clone())
    }
}

pub fn workbench(store: &Arc<MemoryStore>) -> Workbench<TextSurface> {
    let options = WorkbenchOptions {
        autocompletion: true,
        save_debounce: Duration::from_millis(20),
    };
    let remote: Arc<dyn RemoteFiles> = store.clone();
    Workbench::new(TextSurface::new(), remote, options).expect("workbench")
}
