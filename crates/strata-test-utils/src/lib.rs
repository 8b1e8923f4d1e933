//! Testing utilities for the strata workspace
//!
//! Scratch projects with the standard hierarchy registered.

#![allow(missing_docs)]

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strata_tier::{Project, ProjectConfig, SetupOptions, Tier, TierId, TierResult};
use tempfile::TempDir;

/// Temporary project folder plus a [`Project`] rooted in it
#[derive(Debug)]
pub struct TestProject {
    // declared first so the project drops before its folder
    project: Project,
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Adjust the default config before the project is created
    pub fn with_config(f: impl FnOnce(ProjectConfig) -> ProjectConfig) -> Self {
        let dir = TempDir::new().expect("create temp project folder");
        let config = f(ProjectConfig::new(dir.path()));
        let project = Project::with_defaults(config).expect("register default hierarchy");
        Self { project, dir }
    }

    /// Project whose record stores never serve cached values
    pub fn uncached() -> Self {
        Self::with_config(|config| config.with_meta_timeout(Duration::ZERO))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Resolve `name` and set up it and every missing ancestor
    ///
    /// Technique folders needed by data sets are created too.
    pub fn create(&self, name: &str) -> TierResult<Arc<Tier>> {
        let target = self.project.resolve(name)?;
        self.project.setup_project()?;
        for rank in 1..=target.rank() {
            let tier = self.project.get_tier(target.ids().prefix(rank))?;
            if tier.exists() {
                continue;
            }
            if tier.kind().pretty_type() == "DataSet" {
                let sample = self.project.parent(&tier)?.expect("data set has a sample");
                let experiment = self.project.parent(&sample)?.expect("sample has an experiment");
                let technique = tier.id().expect("data set has an id");
                if !experiment.folder().join(technique).exists() {
                    self.project.setup_technique(&experiment, technique)?;
                }
            }
            self.project.setup_files(&tier, SetupOptions::new())?;
        }
        Ok(target)
    }

    /// Tier at `ids` without touching the disk
    pub fn tier<S: Into<String>>(&self, ids: impl IntoIterator<Item = S>) -> Arc<Tier> {
        self.project
            .get_tier(TierId::new(ids))
            .expect("construct tier")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestProject {
    type Target = Project;

    fn deref(&self) -> &Project {
        &self.project
    }
}
