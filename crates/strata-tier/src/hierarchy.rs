//! Hierarchy registry
//!
//! Ordered list of tier kinds; a kind's rank is its index. Rank 0 is the
//! root (Home) and the only kind addressed by zero identifiers.

use crate::error::HierarchyError;
use crate::grammar::{self, NamePart};
use crate::kind::{FolderLayout, Storage, TierKind};
use std::collections::HashSet;
use std::sync::Arc;

/// Validated, ordered set of tier kinds
#[derive(Debug)]
pub struct Hierarchy {
    kinds: Vec<Arc<TierKind>>,
}

impl Hierarchy {
    /// Validate and assemble a hierarchy
    ///
    /// # Errors
    /// - `Empty` for no kinds
    /// - `DuplicateKind` for repeated pretty types
    /// - `NamePart` if rank 0 has a template or a deeper rank lacks one
    /// - `Layout` for layouts that need more ancestors than the rank has
    pub fn new(kinds: Vec<TierKind>) -> Result<Self, HierarchyError> {
        if kinds.is_empty() {
            return Err(HierarchyError::Empty);
        }
        let mut seen = HashSet::new();
        for (rank, kind) in kinds.iter().enumerate() {
            if !seen.insert(kind.pretty_type().to_owned()) {
                return Err(HierarchyError::DuplicateKind(kind.pretty_type().to_owned()));
            }
            match (rank, kind.name_part()) {
                (0, Some(_)) => {
                    return Err(HierarchyError::NamePart {
                        kind: kind.pretty_type().to_owned(),
                        rank,
                        reason: "the root kind cannot have a name template",
                    })
                }
                (r, None) if r > 0 => {
                    return Err(HierarchyError::NamePart {
                        kind: kind.pretty_type().to_owned(),
                        rank,
                        reason: "non-root kinds need a name template",
                    })
                }
                _ => {}
            }
            let layout = kind.layout();
            let misplaced_root = (rank == 0) != (layout == FolderLayout::ProjectRoot);
            if rank < layout.min_rank() || misplaced_root {
                return Err(HierarchyError::Layout {
                    kind: kind.pretty_type().to_owned(),
                    layout: layout.as_str(),
                    rank,
                });
            }
        }
        Ok(Self {
            kinds: kinds.into_iter().map(Arc::new).collect(),
        })
    }

    /// Number of kinds (deepest rank + 1)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Always false for a validated hierarchy
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Kind at `rank`
    #[inline]
    #[must_use]
    pub fn kind(&self, rank: usize) -> Option<&Arc<TierKind>> {
        self.kinds.get(rank)
    }

    /// All kinds in rank order
    #[inline]
    #[must_use]
    pub fn kinds(&self) -> &[Arc<TierKind>] {
        &self.kinds
    }

    /// Root kind
    #[must_use]
    pub fn root(&self) -> &Arc<TierKind> {
        &self.kinds[0]
    }

    /// Rank of the kind answering to `name` (pretty or short type)
    #[must_use]
    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.kinds.iter().position(|k| k.answers_to(name))
    }

    /// Kind one rank up
    #[must_use]
    pub fn parent_kind(&self, rank: usize) -> Option<&Arc<TierKind>> {
        rank.checked_sub(1).and_then(|r| self.kinds.get(r))
    }

    /// Kind one rank down
    #[must_use]
    pub fn child_kind(&self, rank: usize) -> Option<&Arc<TierKind>> {
        self.kinds.get(rank + 1)
    }

    /// Name of the root tier (its pretty type)
    #[must_use]
    pub fn home_name(&self) -> &str {
        self.root().pretty_type()
    }

    fn parts(&self) -> Vec<&NamePart> {
        self.kinds.iter().filter_map(|k| k.name_part()).collect()
    }

    /// Compose the name addressed by `ids`; empty ids give the home name
    #[must_use]
    pub fn compose<S: AsRef<str>>(&self, ids: &[S]) -> String {
        if ids.is_empty() {
            return self.home_name().to_owned();
        }
        grammar::compose(&self.parts(), ids.iter().map(AsRef::as_ref))
    }

    /// Parse `name` into identifiers; empty if it is not a valid name
    #[must_use]
    pub fn parse(&self, name: &str) -> Vec<String> {
        grammar::parse(&self.parts(), name)
    }

    /// True if any kind keeps a meta record
    #[must_use]
    pub fn has_records(&self) -> bool {
        self.kinds.iter().any(|k| k.storage() == Storage::Notebook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> TierKind {
        TierKind::builder("Home")
            .storage(Storage::Home)
            .layout(FolderLayout::ProjectRoot)
            .build()
            .unwrap()
    }

    fn level(name: &str, template: &str) -> TierKind {
        TierKind::builder(name).template(template).build().unwrap()
    }

    #[test]
    fn ranks_follow_order() {
        let h = Hierarchy::new(vec![home(), level("Book", "B{}"), level("Page", "p{}")]).unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.rank_of("Page"), Some(2));
        assert_eq!(h.rank_of("bk"), Some(1));
        assert_eq!(h.parent_kind(2).unwrap().pretty_type(), "Book");
        assert!(h.parent_kind(0).is_none());
        assert!(h.child_kind(2).is_none());
        assert_eq!(h.compose(&["1", "4"]), "B1p4");
        assert_eq!(h.compose::<&str>(&[]), "Home");
        assert_eq!(h.parse("B1p4"), vec!["1", "4"]);
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        assert!(matches!(Hierarchy::new(vec![]), Err(HierarchyError::Empty)));
        assert!(matches!(
            Hierarchy::new(vec![home(), level("Book", "B{}"), level("Book", "C{}")]),
            Err(HierarchyError::DuplicateKind(name)) if name == "Book"
        ));
    }

    #[test]
    fn rejects_misplaced_templates() {
        assert!(matches!(
            Hierarchy::new(vec![level("Book", "B{}")]),
            Err(HierarchyError::NamePart { rank: 0, .. })
        ));
        assert!(matches!(
            Hierarchy::new(vec![home(), TierKind::builder("Book").build().unwrap()]),
            Err(HierarchyError::NamePart { rank: 1, .. })
        ));
    }

    #[test]
    fn rejects_layouts_without_enough_ancestors() {
        let technique = TierKind::builder("Run")
            .template("-{}")
            .layout(FolderLayout::Technique)
            .build()
            .unwrap();
        assert!(matches!(
            Hierarchy::new(vec![home(), technique]),
            Err(HierarchyError::Layout { rank: 1, .. })
        ));
    }
}
