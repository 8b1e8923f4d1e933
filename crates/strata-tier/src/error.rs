//! Error types for the tier layer
//!
//! - [`HierarchyError`]: malformed tier kinds or hierarchies
//! - [`TierError`]: construction, lookup and filesystem setup failures

use strata_meta::{MetaError, SchemaError};
use std::path::PathBuf;

/// Errors while declaring tier kinds or assembling a hierarchy
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// Hierarchy has no kinds at all
    #[error("hierarchy must contain at least one tier kind")]
    Empty,

    /// Two kinds share a pretty type
    #[error("duplicate tier kind: '{0}'")]
    DuplicateKind(String),

    /// Name template does not contain exactly one `{}`
    #[error("name template '{template}' must contain exactly one '{{}}' placeholder")]
    Template { template: String },

    /// Name pattern is not a valid regex
    #[error("invalid name pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Name pattern does not have exactly one capture group
    #[error("name pattern '{pattern}' must have exactly one capture group, found {found}")]
    CaptureGroups { pattern: String, found: usize },

    /// Rank 0 carries a name part, or a deeper rank lacks one
    #[error("tier kind '{kind}' at rank {rank}: {reason}")]
    NamePart {
        kind: String,
        rank: usize,
        reason: &'static str,
    },

    /// Folder layout cannot be used at this rank
    #[error("tier kind '{kind}' cannot use layout {layout} at rank {rank}")]
    Layout {
        kind: String,
        layout: &'static str,
        rank: usize,
    },
}

/// Errors raised by the project context and tier operations
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    /// No hierarchy registered on the project
    #[error("no hierarchy registered for this project")]
    NotRegistered,

    /// A hierarchy is already registered
    #[error("a hierarchy is already registered for this project; reset it first")]
    AlreadyRegistered,

    /// Kind name not in the hierarchy
    #[error("unknown tier kind: '{0}'")]
    UnknownKind(String),

    /// Identifier count does not match rank
    #[error("{kind} takes {expected} identifiers, got {found}")]
    IdentifierCount {
        kind: String,
        expected: usize,
        found: usize,
    },

    /// Composed name does not parse back to the same identifiers
    #[error("identifiers {ids:?} compose to '{name}', which parses back as {parsed:?}")]
    GrammarMismatch {
        ids: Vec<String>,
        name: String,
        parsed: Vec<String>,
    },

    /// Name does not address any tier
    #[error("name '{0}' not recognised as identifying any tier")]
    NameNotRecognised(String),

    /// Tier kind has no child kind
    #[error("{kind} has no child tier kind")]
    NoChildKind { kind: String },

    /// Sibling iteration requested on the root kind
    #[error("{kind} is the root tier and has no siblings")]
    NoSiblings { kind: String },

    /// Tier kind has no record store
    #[error("{kind} has no meta record")]
    NoRecord { kind: String },

    /// Refused to overwrite an existing artifact
    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    /// Highlight label already present
    #[error("highlight '{label}' already exists in {}", .path.display())]
    HighlightExists { path: PathBuf, label: String },

    /// Highlight label not present
    #[error("no highlight named '{label}' in {}", .path.display())]
    NoHighlight { path: PathBuf, label: String },

    /// Highlights sidecar is not a valid highlights document
    #[error("malformed highlights file {}: {source}", .path.display())]
    Highlights {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Notebook template failed to render
    #[error("template for {tier} failed to render: {source}")]
    Template {
        tier: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// Filesystem failure
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record store failure
    #[error(transparent)]
    Meta(#[from] MetaError),

    /// Schema could not be built
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Hierarchy declaration failure
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

impl TierError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create already-exists error for path
    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// True for "already exists" conflicts, including those from a record store
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists { .. }
                | Self::HighlightExists { .. }
                | Self::Meta(MetaError::AlreadyExists { .. })
        )
    }
}

/// Result alias for tier operations
pub type TierResult<T> = Result<T, TierError>;
