//! Discovering existing tiers on disk

use crate::error::{TierError, TierResult};
use crate::files::FileMaker;
use crate::identity::TierId;
use crate::kind::Listing;
use crate::layout::Layout;
use crate::project::Project;
use crate::tier::Tier;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone, Copy)]
enum EntryKind {
    Dirs,
    JsonFiles,
}

/// Sorted entry names of `dir`; a missing folder has none
fn entry_names(dir: &Path, kind: EntryKind) -> TierResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TierError::io(dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TierError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        match kind {
            EntryKind::Dirs if path.is_dir() => names.push(name),
            EntryKind::JsonFiles if path.is_file() => {
                if let Some(stem) = name.strip_suffix(".json") {
                    names.push(stem.to_owned());
                }
            }
            _ => {}
        }
    }
    names.sort();
    Ok(names)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

impl Project {
    /// Existing children of `tier`, found with the child kind's listing rule
    ///
    /// Entries whose names do not address a child of `tier` are skipped with
    /// a warning.
    ///
    /// # Errors
    /// `NoChildKind` at the deepest rank, or `Io` if a folder cannot be read.
    pub fn children(&self, tier: &Tier) -> TierResult<Vec<Arc<Tier>>> {
        let hierarchy = self.hierarchy()?;
        let rank = tier.rank() + 1;
        let kind = hierarchy.kind(rank).ok_or_else(|| TierError::NoChildKind {
            kind: tier.kind().pretty_type().to_owned(),
        })?;

        if kind.listing() == Listing::Techniques {
            let mut found = Vec::new();
            for technique in self.technique_names(tier)? {
                match self.child(tier, &technique) {
                    Ok(child) if child.exists() => found.push(child),
                    Ok(_) => {}
                    Err(e) => warn!(technique = %technique, error = %e, "skipping technique"),
                }
            }
            return Ok(found);
        }

        let names = match kind.listing() {
            Listing::MetaFiles => {
                let layout = Layout::new(&hierarchy, self.config(), self.folder());
                entry_names(&layout.meta_folder(tier.ids(), kind), EntryKind::JsonFiles)?
            }
            _ => entry_names(tier.folder(), EntryKind::Dirs)?
                .into_iter()
                .filter(|name| !is_hidden(name))
                .collect(),
        };

        let mut found = Vec::new();
        for name in names {
            let ids = TierId::new(hierarchy.parse(&name));
            if ids.len() != rank || !tier.ids().is_prefix_of(&ids) {
                warn!(name = %name, parent = %tier.name(), "skipping entry that is not a child");
                continue;
            }
            match self.construct_at(rank, ids) {
                Ok(child) => found.push(child),
                Err(e) => warn!(name = %name, error = %e, "skipping entry"),
            }
        }
        Ok(found)
    }

    /// Existing tiers sharing `tier`'s parent (including `tier`)
    ///
    /// # Errors
    /// `NoSiblings` for the root, or as [`Project::children`].
    pub fn siblings(&self, tier: &Tier) -> TierResult<Vec<Arc<Tier>>> {
        match self.parent(tier)? {
            Some(parent) => self.children(&parent),
            None => Err(TierError::NoSiblings {
                kind: tier.kind().pretty_type().to_owned(),
            }),
        }
    }

    fn technique_names(&self, tier: &Tier) -> TierResult<Vec<String>> {
        match self.parent(tier)? {
            Some(parent) => self.techniques(&parent),
            None => Ok(Vec::new()),
        }
    }

    /// Technique folders of `tier`: sub-folders not starting with `.` or `_`
    ///
    /// # Errors
    /// `Io` if the folder cannot be read.
    pub fn techniques(&self, tier: &Tier) -> TierResult<Vec<String>> {
        Ok(entry_names(tier.folder(), EntryKind::Dirs)?
            .into_iter()
            .filter(|name| !is_hidden(name))
            .collect())
    }

    /// Create technique folder `name` under `tier`
    ///
    /// # Errors
    /// `AlreadyExists` if it exists, `Io` otherwise.
    pub fn setup_technique(&self, tier: &Tier, name: &str) -> TierResult<PathBuf> {
        let path = tier.folder().join(name);
        let mut maker = FileMaker::new();
        maker.mkdir(&path, false)?;
        maker.commit();
        Ok(path)
    }
}
