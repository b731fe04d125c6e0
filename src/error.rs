//! Error types for conversions and the function bridge
//!
//! Every failure is a value: conversions return `BridgeResult` and abort the
//! current call on the first error. Nothing is retried and no partial result
//! is produced.

use crate::host::HostType;
use std::path::PathBuf;
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Host called a non-variadic bridged function with the wrong argument count.
    #[error("call expected {expected} arguments but got {got}")]
    Arity { expected: usize, got: usize },

    /// Host called a variadic bridged function with fewer arguments than its fixed prefix.
    #[error("call expected at least {min} arguments but got {got}")]
    VariadicArity { min: usize, got: usize },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// The natural native type of a host value lacks methods the target interface requires.
    #[error("{found} does not implement {interface}")]
    Capability { interface: String, found: String },

    /// Type kind outside the conversion surface (complex numbers, channels).
    #[error("unsupported type kind {kind}")]
    UnsupportedKind { kind: String },

    /// Exception raised by host code.
    #[error("host exception: {0}")]
    Thrown(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("map keys must be strings, found {0}")]
    NonStringMapKey(String),

    #[error("index {index} out of range for host sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid host sequence length {0}")]
    InvalidLength(f64),

    #[error("expected host {expected}, found {found}")]
    HostTypeMismatch { expected: &'static str, found: HostType },

    #[error("expected native {expected}, found {found}")]
    NativeTypeMismatch { expected: String, found: String },

    #[error("cannot convert undefined or null to object")]
    NullObject,
}

impl BridgeError {
    pub fn host_mismatch(expected: &'static str, found: HostType) -> Self {
        ShapeError::HostTypeMismatch { expected, found }.into()
    }

    pub fn native_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ShapeError::NativeTypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
        .into()
    }

    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }

    /// Stable short name used in structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Arity { .. } | Self::VariadicArity { .. } => "arity",
            Self::Shape(_) => "shape",
            Self::Capability { .. } => "capability",
            Self::UnsupportedKind { .. } => "unsupported_kind",
            Self::Thrown(_) => "host_exception",
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
