//! `atlas.toml` loading and base URL resolution.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::ClientError;

/// File looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "atlas.toml";
/// Environment variable overriding every other base URL source.
pub const BASE_URL_ENV: &str = "ATLAS_API_BASE_URL";
/// Backend port used when none is configured.
pub const DEFAULT_PORT: u16 = 1337;
/// Host assumed when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// Project used when none is configured.
pub const DEFAULT_PROJECT: &str = "default";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 250;

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root, without trailing slash.
    pub base_url: String,
    /// Project sent with every request.
    pub project_name: SmolStr,
    /// Model id sent with AI requests; may be empty.
    pub model: SmolStr,
    /// Per-request connect and read timeout.
    pub timeout: Duration,
    /// Register AI completion providers.
    pub autocompletion: bool,
    /// Trailing window over which saves are coalesced.
    pub save_debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: derive_base_url(DEFAULT_HOST, DEFAULT_PORT),
            project_name: SmolStr::new_static(DEFAULT_PROJECT),
            model: SmolStr::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            autocompletion: true,
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
        }
    }
}

impl ClientConfig {
    /// Loads `path`, applying the base URL environment override.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ClientError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::from_toml_str(&text, env_base_url())
    }

    /// Loads `explicit`, else `atlas.toml` from the working directory if
    /// present, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ClientError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = Path::new(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load(local);
        }
        AtlasToml::default().into_config(env_base_url())
    }

    /// Parses TOML text; `env_base_url` wins over any configured URL.
    pub fn from_toml_str(text: &str, env_base_url: Option<String>) -> Result<Self, ClientError> {
        let raw: AtlasToml = toml::from_str(text)
            .map_err(|err| ClientError::InvalidConfig(format!("{CONFIG_FILE_NAME}: {err}").into()))?;
        raw.into_config(env_base_url)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(
        mut self,
        project: Option<&str>,
        model: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<Self, ClientError> {
        if let Some(project) = project {
            self.project_name = parse_project_name(project)?;
        }
        if let Some(model) = model {
            self.model = SmolStr::new(model.trim());
        }
        if let Some(url) = base_url {
            self.base_url = normalize_base_url(url, "--base-url")?;
        }
        Ok(self)
    }
}

/// Backend URL for a host the client runs against.
///
/// Loopback hosts always map to `127.0.0.1`.
#[must_use]
pub fn derive_base_url(host: &str, port: u16) -> String {
    match host.trim() {
        "localhost" | "127.0.0.1" => format!("http://127.0.0.1:{port}"),
        other => format!("http://{other}:{port}"),
    }
}

fn env_base_url() -> Option<String> {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn normalize_base_url(url: &str, key: &str) -> Result<String, ClientError> {
    let url = url.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ClientError::InvalidConfig(
            format!("{key} must start with http:// or https:// (got '{url}')").into(),
        ));
    }
    Ok(url.to_string())
}

fn parse_project_name(name: &str) -> Result<SmolStr, ClientError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::InvalidConfig(
            "project.name must not be empty".into(),
        ));
    }
    Ok(SmolStr::new(name))
}

#[derive(Debug, Default, Deserialize)]
struct AtlasToml {
    api: Option<ApiSection>,
    project: Option<ProjectSection>,
    editor: Option<EditorSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectSection {
    name: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EditorSection {
    autocompletion: Option<bool>,
    save_debounce_ms: Option<u64>,
}

impl AtlasToml {
    fn into_config(self, env_base_url: Option<String>) -> Result<ClientConfig, ClientError> {
        let api = self.api.unwrap_or_default();
        let project = self.project.unwrap_or_default();
        let editor = self.editor.unwrap_or_default();

        let port = api.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ClientError::InvalidConfig("api.port must be non-zero".into()));
        }
        let base_url = match (env_base_url, api.base_url) {
            (Some(url), _) => normalize_base_url(&url, BASE_URL_ENV)?,
            (None, Some(url)) => normalize_base_url(&url, "api.base_url")?,
            (None, None) => {
                let host = api.host.as_deref().unwrap_or(DEFAULT_HOST);
                if host.trim().is_empty() {
                    return Err(ClientError::InvalidConfig(
                        "api.host must not be empty".into(),
                    ));
                }
                derive_base_url(host, port)
            }
        };

        let timeout_ms = api.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "api.timeout_ms must be greater than zero".into(),
            ));
        }

        let project_name = match project.name {
            Some(name) => parse_project_name(&name)?,
            None => SmolStr::new_static(DEFAULT_PROJECT),
        };

        Ok(ClientConfig {
            base_url,
            project_name,
            model: project.model.map(|model| SmolStr::new(model.trim())).unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
            autocompletion: editor.autocompletion.unwrap_or(true),
            save_debounce: Duration::from_millis(
                editor.save_debounce_ms.unwrap_or(DEFAULT_SAVE_DEBOUNCE_MS),
            ),
        })
    }
}
