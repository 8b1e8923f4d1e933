//! Tier instances
//!
//! A [`Tier`] is one addressable entity of the hierarchy. Its name and
//! paths are fixed at construction; for notebook kinds it owns the record
//! store bound to its meta file.

use crate::defaults::{CONCLUSION, DESCRIPTION, STARTED};
use crate::error::{TierError, TierResult};
use crate::identity::TierId;
use crate::kind::{Storage, TierKind};
use crate::layout::TierPaths;
use chrono::{DateTime, Utc};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use strata_meta::{Field, Meta};
use tracing::info;

/// One addressable entity of the hierarchy
#[derive(Debug)]
pub struct Tier {
    kind: Arc<TierKind>,
    ids: TierId,
    name: String,
    paths: TierPaths,
    meta: Option<Meta>,
}

impl Tier {
    pub(crate) fn new(
        kind: Arc<TierKind>,
        ids: TierId,
        name: String,
        paths: TierPaths,
        meta: Option<Meta>,
    ) -> Self {
        Self {
            kind,
            ids,
            name,
            paths,
            meta,
        }
    }

    /// Kind of this tier
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &Arc<TierKind> {
        &self.kind
    }

    /// Depth in the hierarchy
    #[inline]
    #[must_use]
    pub fn rank(&self) -> usize {
        self.ids.len()
    }

    /// Identifiers
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &TierId {
        &self.ids
    }

    /// Own identifier; `None` for the root
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.ids.last()
    }

    /// Full name, e.g. `WP1.2a`
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All paths
    #[inline]
    #[must_use]
    pub fn paths(&self) -> &TierPaths {
        &self.paths
    }

    /// Tier folder
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.paths.folder
    }

    /// Notebook file
    #[inline]
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.paths.file.as_deref()
    }

    /// Meta record file
    #[inline]
    #[must_use]
    pub fn meta_file(&self) -> Option<&Path> {
        self.paths.meta_file.as_deref()
    }

    /// Highlights sidecar
    #[inline]
    #[must_use]
    pub fn highlights_file(&self) -> Option<&Path> {
        self.paths.highlights_file.as_deref()
    }

    /// Record store
    ///
    /// # Errors
    /// `TierError::NoRecord` for kinds without one.
    pub fn meta(&self) -> TierResult<&Meta> {
        self.meta.as_ref().ok_or_else(|| TierError::NoRecord {
            kind: self.kind.pretty_type().to_owned(),
        })
    }

    /// Read a typed field from the record
    ///
    /// # Errors
    /// `NoRecord`, or store errors.
    pub fn get<T>(&self, field: &Field<T>) -> TierResult<Option<T>> {
        Ok(field.get(self.meta()?)?)
    }

    /// Write a typed field to the record
    ///
    /// # Errors
    /// `NoRecord`, or store errors.
    pub fn set<T>(&self, field: &Field<T>, value: T) -> TierResult<()> {
        Ok(field.set(self.meta()?, value)?)
    }

    /// Description
    ///
    /// # Errors
    /// As [`Tier::get`].
    pub fn description(&self) -> TierResult<Option<String>> {
        self.get(&*DESCRIPTION)
    }

    /// Set description
    ///
    /// # Errors
    /// As [`Tier::set`].
    pub fn set_description(&self, text: impl Into<String>) -> TierResult<()> {
        self.set(&*DESCRIPTION, text.into())
    }

    /// Conclusion
    ///
    /// # Errors
    /// As [`Tier::get`].
    pub fn conclusion(&self) -> TierResult<Option<String>> {
        self.get(&*CONCLUSION)
    }

    /// Set conclusion
    ///
    /// # Errors
    /// As [`Tier::set`].
    pub fn set_conclusion(&self, text: impl Into<String>) -> TierResult<()> {
        self.set(&*CONCLUSION, text.into())
    }

    /// Setup time
    ///
    /// # Errors
    /// As [`Tier::get`].
    pub fn started(&self) -> TierResult<Option<DateTime<Utc>>> {
        self.get(&*STARTED)
    }

    /// Set setup time
    ///
    /// # Errors
    /// As [`Tier::set`].
    pub fn set_started(&self, when: DateTime<Utc>) -> TierResult<()> {
        self.set(&*STARTED, when)
    }

    /// True once the tier's artifacts are on disk
    #[must_use]
    pub fn exists(&self) -> bool {
        match self.kind.storage() {
            Storage::Home => self.file().is_some_and(Path::is_file),
            Storage::Folder => self.folder().is_dir(),
            Storage::Notebook => {
                self.file().is_some_and(Path::is_file)
                    && self.folder().is_dir()
                    && self.meta_file().is_some_and(Path::is_file)
            }
        }
    }

    /// Delete the notebook and meta files; folders are left alone
    ///
    /// # Errors
    /// `TierError::Io` for failures other than a missing file.
    pub fn remove_files(&self) -> TierResult<()> {
        let targets = match self.kind.storage() {
            Storage::Folder => return Ok(()),
            Storage::Home => vec![self.file()],
            Storage::Notebook => vec![self.file(), self.meta_file()],
        };
        for path in targets.into_iter().flatten() {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "removed"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(TierError::io(path, e)),
            }
        }
        if let Some(meta) = &self.meta {
            meta.invalidate();
        }
        Ok(())
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{} ({})>", self.kind.pretty_type(), self.name)
    }
}
