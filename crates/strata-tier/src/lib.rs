//! Strata tier layer
//!
//! Maps compact human names like `WP2.3c-data` onto a fixed-depth hierarchy
//! of research entities, each backed by a folder and (for notebook kinds) a
//! JSON meta record.
//!
//! # Core Operations
//!
//! - **Grammar**: compose a name from identifiers and parse it back
//! - **Identity**: one live [`Tier`] per identifier path per [`Project`]
//! - **Layout**: folder, notebook, meta and highlights paths per kind
//! - **Setup**: create a tier's artifacts, rolling back on failure
//!
//! # Architecture
//!
//! ```text
//! Project ── Hierarchy ── TierKind (NamePart, FieldSet → Schema)
//!    │
//!    └── IdentityCache[rank] ── Arc<Tier> ── Meta (strata-meta)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod defaults;
pub mod error;
pub mod files;
pub mod grammar;
pub mod hierarchy;
pub mod highlights;
pub mod identity;
pub mod kind;
pub mod layout;
pub mod listing;
pub mod project;
pub mod setup;
pub mod tier;

pub use config::{ConfigError, ProjectConfig};
pub use error::{HierarchyError, TierError, TierResult};
pub use files::FileMaker;
pub use grammar::NamePart;
pub use hierarchy::Hierarchy;
pub use highlights::{DisplayPayload, Highlights};
pub use identity::{IdentityCache, TierId};
pub use kind::{FolderLayout, Listing, Storage, TierKind, TierKindBuilder};
pub use layout::{Layout, TierPaths};
pub use project::Project;
pub use setup::SetupOptions;
pub use tier::Tier;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with projects and tiers
    pub use crate::config::ProjectConfig;
    pub use crate::error::{TierError, TierResult};
    pub use crate::identity::TierId;
    pub use crate::kind::{FolderLayout, Listing, Storage, TierKind};
    pub use crate::project::Project;
    pub use crate::setup::SetupOptions;
    pub use crate::tier::Tier;
    pub use strata_meta::prelude::*;
}
