//! Client errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while setting up the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad or unreadable configuration; the message names the key.
    #[error("invalid configuration: {0}")]
    InvalidConfig(SmolStr),

    /// I/O failure outside of configuration parsing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
