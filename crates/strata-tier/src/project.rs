//! Project context
//!
//! [`Project`] owns the registered hierarchy and one identity cache per tier
//! kind. Constructing a tier twice with the same identifiers returns the
//! same `Arc<Tier>` for as long as the project lives (or until
//! [`Project::reset`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_tier::{Project, ProjectConfig};
//!
//! let project = Project::new(ProjectConfig::new("/data/lab"));
//! project.register_defaults()?;
//!
//! let sample = project.resolve("WP1.2a")?;
//! let dataset = project.child(&sample, "scan")?;
//! assert_eq!(dataset.name(), "WP1.2a-scan");
//! ```

use crate::config::ProjectConfig;
use crate::defaults;
use crate::error::{TierError, TierResult};
use crate::hierarchy::Hierarchy;
use crate::identity::{IdentityCache, TierId};
use crate::kind::TierKind;
use crate::layout::Layout;
use crate::tier::Tier;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_meta::Meta;
use tracing::debug;

#[derive(Debug)]
struct Registry {
    hierarchy: Arc<Hierarchy>,
    caches: Vec<IdentityCache>,
}

/// Explicit context for one project folder
#[derive(Debug)]
pub struct Project {
    config: ProjectConfig,
    folder: PathBuf,
    registry: RwLock<Option<Arc<Registry>>>,
}

impl Project {
    /// Project with no hierarchy registered yet
    #[must_use]
    pub fn new(config: ProjectConfig) -> Self {
        let folder = config.resolved_project_folder();
        Self {
            config,
            folder,
            registry: RwLock::new(None),
        }
    }

    /// Project at `folder` with default settings
    #[must_use]
    pub fn open(folder: impl Into<PathBuf>) -> Self {
        Self::new(ProjectConfig::new(folder))
    }

    /// Project with the standard hierarchy registered
    ///
    /// # Errors
    /// As [`Project::register`].
    pub fn with_defaults(config: ProjectConfig) -> TierResult<Self> {
        let project = Self::new(config);
        project.register_defaults()?;
        Ok(project)
    }

    /// Settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Project root folder
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Templates folder
    #[must_use]
    pub fn templates_folder(&self) -> PathBuf {
        self.folder.join(&self.config.templates_dir)
    }

    /// Register the hierarchy; rank is the position in `kinds`
    ///
    /// # Errors
    /// `AlreadyRegistered` if one is registered, `Hierarchy` if `kinds` is
    /// malformed.
    pub fn register(&self, kinds: Vec<TierKind>) -> TierResult<()> {
        let mut slot = self.registry.write();
        if slot.is_some() {
            return Err(TierError::AlreadyRegistered);
        }
        let hierarchy = Hierarchy::new(kinds)?;
        let caches = hierarchy.kinds().iter().map(|_| IdentityCache::new()).collect();
        debug!(
            project = %self.folder.display(),
            kinds = hierarchy.len(),
            "registered hierarchy"
        );
        *slot = Some(Arc::new(Registry {
            hierarchy: Arc::new(hierarchy),
            caches,
        }));
        Ok(())
    }

    /// Register the standard Home → WorkPackage → Experiment → Sample →
    /// DataSet hierarchy
    ///
    /// # Errors
    /// As [`Project::register`].
    pub fn register_defaults(&self) -> TierResult<()> {
        self.register(defaults::default_kinds()?)
    }

    /// Forget the hierarchy and every cached tier
    pub fn reset(&self) {
        if self.registry.write().take().is_some() {
            debug!(project = %self.folder.display(), "reset hierarchy");
        }
    }

    fn registry(&self) -> TierResult<Arc<Registry>> {
        self.registry.read().clone().ok_or(TierError::NotRegistered)
    }

    /// Registered hierarchy
    ///
    /// # Errors
    /// `NotRegistered`.
    pub fn hierarchy(&self) -> TierResult<Arc<Hierarchy>> {
        Ok(Arc::clone(&self.registry()?.hierarchy))
    }

    /// Number of live instances of the kind at `rank`
    #[must_use]
    pub fn cached(&self, rank: usize) -> usize {
        self.registry()
            .ok()
            .and_then(|r| r.caches.get(rank).map(IdentityCache::len))
            .unwrap_or(0)
    }

    /// Construct (or fetch) the tier of kind `kind` with `ids`
    ///
    /// `kind` is matched against pretty and short types.
    ///
    /// # Errors
    /// `UnknownKind`, or as [`Project::construct_at`].
    pub fn construct<I, S>(&self, kind: &str, ids: I) -> TierResult<Arc<Tier>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rank = self
            .hierarchy()?
            .rank_of(kind)
            .ok_or_else(|| TierError::UnknownKind(kind.to_owned()))?;
        self.construct_at(rank, TierId::new(ids))
    }

    /// Construct (or fetch) the tier of the kind at `rank`
    ///
    /// A cached instance is returned as is. Otherwise the identifier count
    /// must equal `rank` and the composed name must parse back to `ids`.
    /// Failed constructions leave the cache untouched.
    ///
    /// # Errors
    /// `NotRegistered`, `UnknownKind`, `IdentifierCount`, `GrammarMismatch`,
    /// or `Schema` if the kind's fields conflict.
    pub fn construct_at(&self, rank: usize, ids: TierId) -> TierResult<Arc<Tier>> {
        let registry = self.registry()?;
        let hierarchy = &registry.hierarchy;
        let (Some(kind), Some(cache)) = (hierarchy.kind(rank), registry.caches.get(rank)) else {
            return Err(TierError::UnknownKind(format!("rank {rank}")));
        };
        if let Some(existing) = cache.get(&ids) {
            return Ok(existing);
        }
        if ids.len() != rank {
            return Err(TierError::IdentifierCount {
                kind: kind.pretty_type().to_owned(),
                expected: rank,
                found: ids.len(),
            });
        }

        let name = hierarchy.compose(ids.segments());
        if rank > 0 {
            let parsed = hierarchy.parse(&name);
            if parsed != ids.segments() {
                return Err(TierError::GrammarMismatch {
                    ids: ids.segments().to_vec(),
                    name,
                    parsed,
                });
            }
        }

        let paths = Layout::new(hierarchy, &self.config, &self.folder).paths(kind, &ids);
        let meta = match (&paths.meta_file, kind.storage().has_record()) {
            (Some(file), true) => {
                Some(Meta::new(file, kind.schema()?).with_timeout(self.config.meta_timeout()))
            }
            _ => None,
        };
        debug!(kind = %kind, name = %name, "constructed tier");
        Ok(cache.publish(Tier::new(Arc::clone(kind), ids, name, paths, meta)))
    }

    /// Tier addressed by the identifier count
    ///
    /// # Errors
    /// As [`Project::construct_at`].
    pub fn get_tier(&self, ids: TierId) -> TierResult<Arc<Tier>> {
        self.construct_at(ids.len(), ids)
    }

    /// Root tier
    ///
    /// # Errors
    /// `NotRegistered`.
    pub fn home(&self) -> TierResult<Arc<Tier>> {
        self.construct_at(0, TierId::root())
    }

    /// Tier one rank up; `None` for the root
    ///
    /// # Errors
    /// As [`Project::construct_at`].
    pub fn parent(&self, tier: &Tier) -> TierResult<Option<Arc<Tier>>> {
        tier.ids()
            .parent()
            .map(|ids| self.get_tier(ids))
            .transpose()
    }

    /// Child of `tier` with identifier `id`
    ///
    /// # Errors
    /// `NoChildKind` at the deepest rank, or as [`Project::construct_at`].
    pub fn child(&self, tier: &Tier, id: &str) -> TierResult<Arc<Tier>> {
        let rank = tier.rank() + 1;
        if self.hierarchy()?.kind(rank).is_none() {
            return Err(TierError::NoChildKind {
                kind: tier.kind().pretty_type().to_owned(),
            });
        }
        self.construct_at(rank, tier.ids().child(id))
    }

    /// Identifiers of `name`; empty if it is not a valid name
    ///
    /// # Errors
    /// `NotRegistered`.
    pub fn parse(&self, name: &str) -> TierResult<TierId> {
        Ok(TierId::new(self.hierarchy()?.parse(name)))
    }

    /// Tier named `name`
    ///
    /// # Errors
    /// `NameNotRecognised` for names that do not parse, or as
    /// [`Project::construct_at`].
    pub fn resolve(&self, name: &str) -> TierResult<Arc<Tier>> {
        let hierarchy = self.hierarchy()?;
        if name == hierarchy.home_name() {
            return self.home();
        }
        let ids = TierId::new(hierarchy.parse(name));
        if ids.is_empty() {
            return Err(TierError::NameNotRecognised(name.to_owned()));
        }
        self.get_tier(ids)
    }
}
