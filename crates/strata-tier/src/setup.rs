//! Creating tier artifacts on disk
//!
//! Every multi-step setup runs through a [`FileMaker`], so a failure part
//! way through removes whatever the call had already created.
//!
//! Notebook templates are Handlebars templates rendered in strict mode. The
//! tier is available as `tier` and under its short type (`wp`, `exp`, ...):
//!
//! ```text
//! # {{tier.name}}
//! {{#if tier.id}}Identifier {{tier.id}} of {{tier.kind}}{{/if}}
//! ```

use crate::error::{TierError, TierResult};
use crate::files::FileMaker;
use crate::kind::Storage;
use crate::project::Project;
use crate::tier::Tier;
use chrono::Utc;
use handlebars::{no_escape, Handlebars};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_meta::Record;
use tracing::{debug, info};

/// Notebook written when no template is available
pub const BLANK_NOTEBOOK: &str =
    r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#;

/// Template copied into the templates folder by [`Project::setup_project`]
pub const BASE_TEMPLATE: &str = r##"{
 "cells": [
  {"cell_type": "markdown", "metadata": {}, "source": ["# {{tier.name}}"]}
 ],
 "metadata": {},
 "nbformat": 4,
 "nbformat_minor": 5
}
"##;

/// Extra inputs for [`Project::setup_files`]
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Template path relative to the templates folder
    pub template: Option<PathBuf>,
    /// Initial meta record
    pub meta: Record,
}

impl SetupOptions {
    /// No template override, empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With template path relative to the templates folder
    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// With initial meta value
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

static RENDERER: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(no_escape);
    registry
});

/// Render a notebook template for `tier`
///
/// The context holds `tier` (`name`, `id`, `kind`, `short_type`, `folder`,
/// `meta`) and the same object under the tier's short type. `meta` is the
/// record the tier is created with.
///
/// # Errors
/// `Template` for syntax errors and for placeholders that name a missing
/// value.
pub fn render_template(template: &str, tier: &Tier, meta: &Record) -> TierResult<String> {
    let kind = tier.kind();
    let view = json!({
        "name": tier.name(),
        "id": tier.id(),
        "kind": kind.pretty_type(),
        "short_type": kind.short_type(),
        "folder": tier.folder().display().to_string(),
        "meta": meta,
    });
    let mut context = Map::new();
    context.insert(kind.short_type().to_owned(), view.clone());
    context.insert("tier".to_owned(), view);
    RENDERER
        .render_template(template, &context)
        .map_err(|source| TierError::Template {
            tier: tier.name().to_owned(),
            source: Box::new(source),
        })
}

fn write_notebook_files(
    maker: &mut FileMaker,
    tier: &Tier,
    file: &Path,
    notebook: &str,
    initial: Record,
) -> TierResult<()> {
    let meta = tier.meta()?;
    if let Some(meta_folder) = meta.file().parent() {
        maker.mkdir(meta_folder, true)?;
    }
    meta.create(initial)?;
    maker.track_file(meta.file());
    tier.set_started(Utc::now())?;
    maker.write_file(file, notebook, false)?;
    maker.mkdir(tier.folder(), true)?;
    Ok(())
}

impl Project {
    /// Default template of a kind, relative to the templates folder
    #[must_use]
    pub fn default_template(&self, pretty_type: &str) -> PathBuf {
        Path::new(pretty_type).join(format!(
            "{pretty_type}.tmplt.{}",
            self.config().home_notebook_ext
        ))
    }

    /// Templates available for a kind, relative to the templates folder
    ///
    /// # Errors
    /// `Io` if the kind's template folder cannot be read.
    pub fn templates(&self, pretty_type: &str) -> TierResult<Vec<PathBuf>> {
        let folder = self.templates_folder().join(pretty_type);
        if !folder.is_dir() {
            return Ok(Vec::new());
        }
        let mut templates = Vec::new();
        for entry in fs::read_dir(&folder).map_err(|e| TierError::io(&folder, e))? {
            let entry = entry.map_err(|e| TierError::io(&folder, e))?;
            if entry.path().is_file() {
                templates.push(Path::new(pretty_type).join(entry.file_name()));
            }
        }
        templates.sort();
        Ok(templates)
    }

    fn notebook_text(
        &self,
        tier: &Tier,
        template: Option<&Path>,
        meta: &Record,
    ) -> TierResult<String> {
        let pretty_type = tier.kind().pretty_type();
        let path = match template {
            Some(explicit) => self.templates_folder().join(explicit),
            None => {
                let default = self.templates_folder().join(self.default_template(pretty_type));
                if !default.is_file() {
                    debug!(kind = %pretty_type, "no default template, writing blank notebook");
                    return Ok(BLANK_NOTEBOOK.to_owned());
                }
                default
            }
        };
        let text = fs::read_to_string(&path).map_err(|e| TierError::io(&path, e))?;
        debug!(template = %path.display(), tier = %tier.name(), "rendering template");
        render_template(&text, tier, meta)
    }

    /// Create the artifacts of `tier`
    ///
    /// - Notebook kinds: meta folder, meta record (with `started` set to
    ///   now), notebook, tier folder
    /// - Folder kinds: parent folder if absent, tier folder
    /// - Home: children folder, home notebook
    ///
    /// # Errors
    /// `AlreadyExists` if the meta record, notebook or (folder kinds) the
    /// folder exists; validation errors for a bad initial record; IO errors.
    /// Artifacts created by the failing call are removed again.
    pub fn setup_files(&self, tier: &Tier, options: SetupOptions) -> TierResult<()> {
        match tier.kind().storage() {
            Storage::Notebook => self.setup_notebook(tier, options),
            Storage::Folder => {
                let mut maker = FileMaker::new();
                if let Some(parent) = tier.folder().parent() {
                    maker.mkdir(parent, true)?;
                }
                maker.mkdir(tier.folder(), false)?;
                maker.commit();
                Ok(())
            }
            Storage::Home => {
                let mut maker = FileMaker::new();
                maker.mkdir(tier.folder(), true)?;
                maker.commit();

                let file = tier.file().ok_or_else(|| TierError::NoRecord {
                    kind: tier.kind().pretty_type().to_owned(),
                })?;
                let text =
                    self.notebook_text(tier, options.template.as_deref(), &options.meta)?;
                let mut maker = FileMaker::new();
                maker.write_file(file, &text, false)?;
                maker.commit();
                Ok(())
            }
        }
    }

    fn setup_notebook(&self, tier: &Tier, options: SetupOptions) -> TierResult<()> {
        let meta = tier.meta()?;
        let file = tier.file().ok_or_else(|| TierError::NoRecord {
            kind: tier.kind().pretty_type().to_owned(),
        })?;
        if meta.exists() {
            return Err(TierError::already_exists(meta.file()));
        }
        if file.exists() {
            return Err(TierError::already_exists(file));
        }
        let notebook = self.notebook_text(tier, options.template.as_deref(), &options.meta)?;

        info!(tier = %tier.name(), "creating files");
        let mut maker = FileMaker::new();
        match write_notebook_files(&mut maker, tier, file, &notebook, options.meta) {
            Ok(()) => {
                maker.commit();
                Ok(())
            }
            Err(e) => {
                maker.rollback();
                meta.invalidate();
                Err(e)
            }
        }
    }

    /// Create the templates folder and Home
    ///
    /// Returns Home. Does nothing if Home already exists.
    ///
    /// # Errors
    /// As [`Project::setup_files`].
    pub fn setup_project(&self) -> TierResult<Arc<Tier>> {
        let home = self.home()?;
        if home.exists() {
            return Ok(home);
        }
        info!(project = %self.folder().display(), "setting up project");

        let templates = self.templates_folder();
        let mut maker = FileMaker::new();
        maker.mkdir(&templates, true)?;
        for kind in self.hierarchy()?.kinds() {
            if kind.storage() != Storage::Notebook {
                continue;
            }
            maker.mkdir(&templates.join(kind.pretty_type()), true)?;
            maker.write_file(
                &templates.join(self.default_template(kind.pretty_type())),
                BASE_TEMPLATE,
                true,
            )?;
        }
        maker.commit();

        self.setup_files(&home, SetupOptions::new())?;
        Ok(home)
    }
}
