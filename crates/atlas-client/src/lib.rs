//! `atlas-client` - configuration and HTTP transport for the Atlas workbench.
//!
//! [`HttpRemote`] implements [`atlas_editor::RemoteFiles`] over the backend's
//! JSON endpoints; [`ClientConfig`] resolves where that backend lives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// `atlas.toml` loading and base URL resolution.
pub mod config;
/// Client errors.
pub mod error;
/// `ureq`-backed remote file store.
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpRemote;
