//! Error types for bibresolve.
//!
//! Library crates use [`BibError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all bibresolve operations.
#[derive(Debug, thiserror::Error)]
pub enum BibError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The request could not be sent or no response was received (includes timeouts).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body does not match the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A well-formed response that carries no usable record.
    #[error("no usable data: {0}")]
    EmptyResult(String),

    /// A record that fails the canonical-schema invariants.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The lookup key was rejected before any request was made.
    #[error("invalid lookup key: {message}")]
    InvalidKey { message: String },

    /// The provider does not offer this lookup capability.
    #[error("{provider} does not support {capability} lookups")]
    Unsupported {
        provider: String,
        capability: &'static str,
    },

    /// Every text-recovery strategy was exhausted.
    #[error("could not parse {message}")]
    Parse { message: String },

    /// The generative text capability failed.
    #[error("completion error: {0}")]
    Completion(String),

    /// Every configured provider failed for this lookup.
    #[error("no provider returned data ({tried} tried)")]
    NoProviderData { tried: usize },

    /// The caller cancelled the resolution or its deadline elapsed.
    #[error("resolution cancelled")]
    Cancelled,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BibError>;

impl BibError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a key-validation error from any displayable message.
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: msg.into(),
        }
    }

    /// Create a text-parser exhaustion error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
