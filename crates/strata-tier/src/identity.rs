//! Tier identifiers and the per-kind identity cache

use crate::tier::Tier;
use dashmap::DashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Ordered identifiers of a tier, one per rank below the root
///
/// Empty strings are dropped on construction, so `["1", "", "2"]` addresses
/// the same tier as `["1", "2"]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TierId(Vec<String>);

impl TierId {
    /// Identifiers with empty entries removed
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            ids.into_iter()
                .map(Into::into)
                .filter(|id: &String| !id.is_empty())
                .collect(),
        )
    }

    /// Root identity
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Identifier segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of identifiers (the addressed rank)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root identity
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last identifier
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// First `len` identifiers
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Identity one rank up
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.prefix(self.0.len() - 1))
        }
    }

    /// Identity one rank down
    #[must_use]
    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.into());
        Self::new(segments)
    }

    /// True if `self` is `other` or one of its ancestors
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl Display for TierId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for TierId {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Identifier → live instance map for one tier kind
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: DashMap<TierId, Arc<Tier>>,
}

impl IdentityCache {
    /// Empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Live instance for `id`
    #[inline]
    #[must_use]
    pub fn get(&self, id: &TierId) -> Option<Arc<Tier>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Publish `tier`, or return the instance published first
    pub fn publish(&self, tier: Tier) -> Arc<Tier> {
        let entry = self
            .entries
            .entry(tier.ids().clone())
            .or_insert_with(|| Arc::new(tier));
        Arc::clone(entry.value())
    }

    /// Number of live instances
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was constructed yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all instances
    pub fn clear(&self) {
        self.entries.clear();
    }
}
