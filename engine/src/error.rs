//! Error types for the Orderflux engine.
//!
//! Two families live here. [`Error`] covers failures of the engine's own
//! plumbing (a local store call failing, the worker being gone). [`SyncError`]
//! is a value carried inside responses and events: remote failures travel
//! through the pipeline as data and never abort it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// All possible errors from the Orderflux engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("local store failure: {0}")]
    Store(String),

    #[error("sync worker has stopped")]
    WorkerStopped,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a remote sync failure.
///
/// Decoding is permissive: any code that is not one of the canonical names
/// (compared case-insensitively) becomes [`ErrorKind::GenericError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    UnknownOrder,
    InvalidResponse,
    #[default]
    GenericError,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 3] = [
        ErrorKind::UnknownOrder,
        ErrorKind::InvalidResponse,
        ErrorKind::GenericError,
    ];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownOrder => "UNKNOWN_ORDER",
            ErrorKind::InvalidResponse => "INVALID_RESPONSE",
            ErrorKind::GenericError => "GENERIC_ERROR",
        }
    }

    /// Decode an upstream error code.
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| code.eq_ignore_ascii_case(kind.as_str()))
            .unwrap_or(ErrorKind::GenericError)
    }

    /// Decode an optional upstream error code; a missing code is generic.
    pub fn from_optional_code(code: Option<&str>) -> Self {
        code.map(Self::from_code).unwrap_or_default()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ErrorKind {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_optional_code(code.as_deref()))
    }
}

/// A sync failure reported by the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncError {
    #[serde(default)]
    pub kind: ErrorKind,
    #[serde(default)]
    pub message: String,
}

impl SyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from a raw upstream code.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_code(code), message)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GenericError, message)
    }

    pub fn unknown_order(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownOrder, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    /// Same message, kind collapsed to [`ErrorKind::GenericError`].
    ///
    /// List-level errors are always reported this way.
    pub fn into_generic(self) -> Self {
        Self::generic(self.message)
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl From<Error> for SyncError {
    fn from(err: Error) -> Self {
        SyncError::generic(err.to_string())
    }
}
