//! The standard research hierarchy
//!
//! `Home → WorkPackage → Experiment → Sample → DataSet`, named like
//! `WP2.3c-data`.

use crate::error::HierarchyError;
use crate::kind::{FolderLayout, Listing, Storage, TierKind};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::sync::Arc;
use strata_meta::{Field, FieldSet, FieldTag, FieldType};

/// Free-text description of a notebook tier
pub static DESCRIPTION: Lazy<Field<String>> =
    Lazy::new(|| Field::new("description", FieldType::String).tagged(FieldTag::Core));

/// Free-text conclusion of a notebook tier
pub static CONCLUSION: Lazy<Field<String>> =
    Lazy::new(|| Field::new("conclusion", FieldType::String).tagged(FieldTag::Core));

/// When the tier was set up
pub static STARTED: Lazy<Field<DateTime<Utc>>> =
    Lazy::new(|| Field::new("started", FieldType::DateTime).tagged(FieldTag::Core));

/// Fields every notebook tier declares
pub static NOTEBOOK_FIELDS: Lazy<Arc<FieldSet>> = Lazy::new(|| {
    Arc::new(
        FieldSet::new("NotebookTier")
            .declare(&*DESCRIPTION)
            .declare(&*CONCLUSION)
            .declare(&*STARTED),
    )
});

fn notebook_fields(kind: &str) -> Arc<FieldSet> {
    Arc::new(FieldSet::new(kind).include(Arc::clone(&*NOTEBOOK_FIELDS)))
}

/// Root tier
///
/// # Errors
/// Never in practice; kept fallible like every kind declaration.
pub fn home() -> Result<TierKind, HierarchyError> {
    TierKind::builder("Home")
        .storage(Storage::Home)
        .layout(FolderLayout::ProjectRoot)
        .build()
}

/// `WP{}`, one notebook per work package
///
/// # Errors
/// As [`home`].
pub fn work_package() -> Result<TierKind, HierarchyError> {
    TierKind::builder("WorkPackage")
        .short_type("wp")
        .template("WP{}")
        .fields(notebook_fields("WorkPackage"))
        .build()
}

/// `.{}`, one notebook per experiment
///
/// # Errors
/// As [`home`].
pub fn experiment() -> Result<TierKind, HierarchyError> {
    TierKind::builder("Experiment")
        .short_type("exp")
        .template(".{}")
        .fields(notebook_fields("Experiment"))
        .build()
}

/// `{}` with a non-digit, dash-free id; shares the experiment folder
///
/// # Errors
/// As [`home`].
pub fn sample() -> Result<TierKind, HierarchyError> {
    TierKind::builder("Sample")
        .template("{}")
        .id_regex(r"([^0-9^-][^-]*)")
        .layout(FolderLayout::ParentFolder)
        .fields(notebook_fields("Sample"))
        .build()
}

/// `-{}` naming a technique; a folder under `<experiment>/<technique>/`
///
/// # Errors
/// As [`home`].
pub fn dataset() -> Result<TierKind, HierarchyError> {
    TierKind::builder("DataSet")
        .short_type("dset")
        .template("-{}")
        .id_regex(r"(.+)")
        .storage(Storage::Folder)
        .layout(FolderLayout::Technique)
        .listing(Listing::Techniques)
        .build()
}

/// All standard kinds in rank order
///
/// # Errors
/// As [`home`].
pub fn default_kinds() -> Result<Vec<TierKind>, HierarchyError> {
    Ok(vec![home()?, work_package()?, experiment()?, sample()?, dataset()?])
}
