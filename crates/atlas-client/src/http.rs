//! `ureq`-backed remote file store.
//!
//! Every call is a blocking JSON request against the configured base URL.
//! Non-success statuses become [`RemoteErrorKind::Status`] failures, so
//! callers never mistake an error page for data.
//!
//! [`RemoteErrorKind::Status`]: atlas_editor::RemoteErrorKind::Status

use atlas_editor::remote::{RemoteFile, RemoteFiles, SaveContent, Suggestion};
use atlas_editor::{RemoteError, RemoteOp};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use smol_str::SmolStr;
use tracing::debug;

use crate::config::ClientConfig;

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
struct SuggestionList {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Rectified {
    #[serde(rename = "rectifiedCode")]
    rectified_code: String,
}

/// Remote file store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    agent: ureq::Agent,
    base_url: String,
    project_name: SmolStr,
    model: SmolStr,
}

impl HttpRemote {
    /// Client for the backend described by `config`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .build();
        Self {
            agent,
            base_url: config.base_url.clone(),
            project_name: config.project_name.clone(),
            model: config.model.clone(),
        }
    }

    /// Backend root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, op: RemoteOp, method: &str, path: &str, body: &Value) -> Result<String, RemoteError> {
        debug!("{method} {path} ({op})");
        let result = self
            .agent
            .request(method, &self.url(path))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());
        read_body(op, result)
    }
}

fn read_body(
    op: RemoteOp,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<String, RemoteError> {
    match result {
        Ok(response) => response
            .into_string()
            .map_err(|err| RemoteError::transport(op, err.to_string())),
        Err(ureq::Error::Status(status, _)) => Err(RemoteError::status(op, status)),
        Err(err) => Err(RemoteError::transport(op, err.to_string())),
    }
}

fn decode<T: DeserializeOwned>(op: RemoteOp, text: &str) -> Result<T, RemoteError> {
    serde_json::from_str(text).map_err(|err| RemoteError::decode(op, err.to_string()))
}

/// Untyped descriptor; an empty body reads as `null`.
fn decode_value(op: RemoteOp, text: &str) -> Result<Value, RemoteError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    decode(op, text)
}

impl RemoteFiles for HttpRemote {
    fn list_files(&self) -> Result<Vec<RemoteFile>, RemoteError> {
        let op = RemoteOp::List;
        let path = format!(
            "/api/get-project-files?project_name={}",
            urlencoding::encode(&self.project_name)
        );
        debug!("GET {path} ({op})");
        let result = self.agent.get(&self.url(&path)).call();
        let body = read_body(op, result)?;
        Ok(decode::<FileList>(op, &body)?.files)
    }

    fn create(&self, filename: &str) -> Result<Value, RemoteError> {
        let op = RemoteOp::Create;
        let body = json!({ "filename": filename, "projectName": self.project_name.as_str() });
        let text = self.send(op, "POST", "/api/files/create", &body)?;
        decode_value(op, &text)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<Value, RemoteError> {
        let op = RemoteOp::Rename;
        let body = json!({
            "oldName": old_name,
            "newName": new_name,
            "projectName": self.project_name.as_str(),
        });
        let text = self.send(op, "PUT", "/api/files/rename", &body)?;
        decode_value(op, &text)
    }

    fn delete(&self, filename: &str) -> Result<Value, RemoteError> {
        let op = RemoteOp::Delete;
        let body = json!({ "filename": filename, "projectName": self.project_name.as_str() });
        let text = self.send(op, "DELETE", "/api/files/delete", &body)?;
        decode_value(op, &text)
    }

    fn save(&self, save: &SaveContent<'_>) -> Result<(), RemoteError> {
        let body = json!({
            "filename": save.filename,
            "content": save.content,
            "project_name": self.project_name.as_str(),
            "revision": save.revision,
        });
        self.send(RemoteOp::Save, "POST", "/api/codeeditorsave", &body)
            .map(drop)
    }

    fn suggestions(&self, language: &str, code: &str) -> Result<Vec<Suggestion>, RemoteError> {
        let op = RemoteOp::Suggestions;
        let body = json!({
            "language": language,
            "code": code,
            "project_name": self.project_name.as_str(),
            "base_model": self.model.as_str(),
        });
        let text = self.send(op, "POST", "/api/code-suggestions", &body)?;
        Ok(decode::<SuggestionList>(op, &text)?.suggestions)
    }

    fn rectify(&self, code: &str, prompt: &str) -> Result<String, RemoteError> {
        let op = RemoteOp::Rectify;
        let body = json!({
            "code": code,
            "prompt": prompt,
            "base_model": self.model.as_str(),
            "project_name": self.project_name.as_str(),
        });
        let text = self.send(op, "POST", "/rectify", &body)?;
        Ok(decode::<Rectified>(op, &text)?.rectified_code)
    }
}
