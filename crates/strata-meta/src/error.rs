//! Error types for schemas and record stores
//!
//! - [`SchemaError`]: building a schema out of field sets
//! - [`MetaError`]: reading, validating and writing a record file

use crate::schema::{FieldSpec, SchemaViolation};
use std::path::{Path, PathBuf};

/// Errors while aggregating field sets into a schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Same field name declared twice with a different type or default
    #[error(
        "conflicting declarations of field '{field}' in {schema}: {} vs {}",
        .first.field_type(),
        .second.field_type()
    )]
    ConflictingField {
        schema: String,
        field: String,
        first: Box<FieldSpec>,
        second: Box<FieldSpec>,
    },

    /// Generated JSON Schema document was rejected by the compiler
    #[error("schema {schema} does not compile: {reason}")]
    Compile { schema: String, reason: String },
}

/// Errors raised by a record store
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// Document or value rejected by the schema
    #[error("invalid data in {}: {violation}", .file.display())]
    Validation {
        file: PathBuf,
        #[source]
        violation: SchemaViolation,
    },

    /// File content is not JSON
    #[error("malformed JSON in {}: {source}", .file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Stored value does not decode into the requested Rust type
    #[error("field '{key}' in {} could not be decoded: {source}", .file.display())]
    Decode {
        file: PathBuf,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key absent and no declared default
    #[error("key '{key}' not found in {}", .file.display())]
    KeyNotFound { file: PathBuf, key: String },

    /// Refused to overwrite an existing record file
    #[error("{} already exists", .file.display())]
    AlreadyExists { file: PathBuf },

    /// Filesystem failure
    #[error("io error on {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MetaError {
    /// Create validation error for file
    pub fn validation(file: impl Into<PathBuf>, violation: SchemaViolation) -> Self {
        Self::Validation {
            file: file.into(),
            violation,
        }
    }

    /// Create parse error for file
    pub fn parse(file: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            file: file.into(),
            source,
        }
    }

    /// Create decode error for a key of file
    pub fn decode(file: impl Into<PathBuf>, key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            file: file.into(),
            key: key.into(),
            source,
        }
    }

    /// Create key-not-found error
    pub fn key_not_found(file: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            file: file.into(),
            key: key.into(),
        }
    }

    /// Create IO error for file
    pub fn io(file: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            file: file.into(),
            source,
        }
    }

    /// Record file this error refers to
    #[must_use]
    pub fn file(&self) -> &Path {
        match self {
            Self::Validation { file, .. }
            | Self::Parse { file, .. }
            | Self::Decode { file, .. }
            | Self::KeyNotFound { file, .. }
            | Self::AlreadyExists { file }
            | Self::Io { file, .. } => file,
        }
    }

    /// True for schema rejections
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// True for missing keys
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Result alias for record store operations
pub type MetaResult<T> = Result<T, MetaError>;
