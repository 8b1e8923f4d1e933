//! Strata record layer
//!
//! Small JSON documents with typed, declared fields, validated before they
//! touch disk.
//!
//! # Core Pieces
//!
//! - **Schema**: declared fields ([`FieldSpec`]) plus an open catch-all
//! - **Field sets**: per-kind declarations aggregated by [`FieldSet::build_schema`]
//! - **Accessors**: [`Field<T>`] reads and writes one key as a Rust value
//! - **Store**: [`Meta`], a JSON file mirrored by a staleness-timed cache
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_meta::prelude::*;
//! use std::sync::Arc;
//!
//! let title: Field<String> = Field::new("title", FieldType::String);
//! let schema = FieldSet::new("Note").declare(&title).build_schema("NoteMeta")?;
//! let meta = Meta::new("note.json", Arc::new(schema));
//!
//! title.set(&meta, "first light".into())?;
//! assert_eq!(title.get(&meta)?.as_deref(), Some("first light"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod accessor;
pub mod error;
pub mod fields;
pub mod schema;
pub mod store;

pub use accessor::Field;
pub use error::{MetaError, MetaResult, SchemaError};
pub use fields::FieldSet;
pub use schema::{FieldSpec, FieldTag, FieldType, Schema, SchemaViolation, Validation};
pub use store::{Meta, Record};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with record stores
    pub use crate::accessor::Field;
    pub use crate::error::{MetaError, MetaResult, SchemaError};
    pub use crate::fields::FieldSet;
    pub use crate::schema::{FieldSpec, FieldTag, FieldType, Schema, Validation};
    pub use crate::store::{Meta, Record};
}
