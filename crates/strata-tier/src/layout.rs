//! On-disk layout of tiers
//!
//! Paths are derived from the hierarchy and the identifiers alone, so no
//! ancestor tier has to be constructed to place a descendant.
//!
//! ```text
//! <project>/
//!   Home.ipynb
//!   WorkPackages/                      Home folder
//!     .wps/WP1.json  .wps/WP1.hlts     WorkPackage meta + highlights
//!     WP1.ipynb
//!     WP1/                             WorkPackage folder
//!       .exps/WP1.2.json
//!       WP1.2.ipynb
//!       WP1.2/                         Experiment folder (= Sample folder)
//!         .smpls/WP1.2a.json
//!         WP1.2a.ipynb
//!         scan/a/                      DataSet WP1.2a-scan
//! ```

use crate::config::ProjectConfig;
use crate::hierarchy::Hierarchy;
use crate::identity::TierId;
use crate::kind::{FolderLayout, Storage, TierKind};
use std::path::{Path, PathBuf};

/// Every path a tier may own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPaths {
    /// Tier folder
    pub folder: PathBuf,
    /// Notebook file
    pub file: Option<PathBuf>,
    /// Meta record
    pub meta_file: Option<PathBuf>,
    /// Highlights sidecar
    pub highlights_file: Option<PathBuf>,
}

/// Path derivation for one project
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    hierarchy: &'a Hierarchy,
    config: &'a ProjectConfig,
    project_folder: &'a Path,
}

impl<'a> Layout<'a> {
    /// Layout of `hierarchy` under `project_folder`
    #[must_use]
    pub fn new(hierarchy: &'a Hierarchy, config: &'a ProjectConfig, project_folder: &'a Path) -> Self {
        Self {
            hierarchy,
            config,
            project_folder,
        }
    }

    /// Folder of the tier addressed by `ids`
    #[must_use]
    pub fn folder(&self, ids: &TierId) -> PathBuf {
        let rank = ids.len();
        let Some(kind) = self.hierarchy.kind(rank) else {
            return self.project_folder.to_path_buf();
        };
        match kind.layout() {
            FolderLayout::ProjectRoot => match self.hierarchy.child_kind(rank) {
                Some(child) => self
                    .project_folder
                    .join(format!("{}s", child.pretty_type())),
                None => self.project_folder.to_path_buf(),
            },
            FolderLayout::Nested => self
                .folder(&ids.prefix(rank - 1))
                .join(self.hierarchy.compose(ids.segments())),
            FolderLayout::ParentFolder => self.folder(&ids.prefix(rank - 1)),
            FolderLayout::Technique => {
                let segments = ids.segments();
                self.folder(&ids.prefix(rank - 2))
                    .join(&segments[rank - 1])
                    .join(&segments[rank - 2])
            }
        }
    }

    /// Folder holding the meta records of `kind` instances under `parent`
    #[must_use]
    pub fn meta_folder(&self, parent: &TierId, kind: &TierKind) -> PathBuf {
        self.folder(parent)
            .join(self.config.meta_dir_name(kind.short_type()))
    }

    /// Home notebook path
    #[must_use]
    pub fn home_file(&self) -> PathBuf {
        self.project_folder.join(self.notebook_name(self.hierarchy.home_name()))
    }

    fn notebook_name(&self, name: &str) -> String {
        format!("{name}.{}", self.config.home_notebook_ext)
    }

    /// All paths of the tier addressed by `ids`
    #[must_use]
    pub fn paths(&self, kind: &TierKind, ids: &TierId) -> TierPaths {
        let folder = self.folder(ids);
        let name = self.hierarchy.compose(ids.segments());
        match kind.storage() {
            Storage::Home => TierPaths {
                folder,
                file: Some(self.project_folder.join(self.notebook_name(&name))),
                meta_file: None,
                highlights_file: None,
            },
            Storage::Folder => TierPaths {
                folder,
                file: None,
                meta_file: None,
                highlights_file: None,
            },
            Storage::Notebook => {
                let parent_folder = ids
                    .parent()
                    .map_or_else(|| self.project_folder.to_path_buf(), |p| self.folder(&p));
                let meta_folder = parent_folder.join(self.config.meta_dir_name(kind.short_type()));
                TierPaths {
                    folder,
                    file: Some(parent_folder.join(self.notebook_name(&name))),
                    meta_file: Some(meta_folder.join(format!("{name}.json"))),
                    highlights_file: Some(meta_folder.join(format!("{name}.hlts"))),
                }
            }
        }
    }
}
