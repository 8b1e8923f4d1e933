//! Tier kinds
//!
//! A [`TierKind`] is the static description of one level of the hierarchy:
//! how it is named, where its files live, how its instances are discovered
//! and which meta fields it declares.

use crate::error::HierarchyError;
use crate::grammar::NamePart;
use once_cell::sync::OnceCell;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use strata_meta::{FieldSet, Schema, SchemaError};

/// Identifier pattern used when a kind does not declare one
pub const DEFAULT_ID_REGEX: &str = r"(\d+)";

/// Which artifacts a tier owns on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Root tier: a notebook in the project folder plus a folder for children
    Home,
    /// A folder only
    Folder,
    /// Folder, notebook, meta record and highlights sidecar
    Notebook,
}

impl Storage {
    /// True if instances carry a meta record
    #[inline]
    #[must_use]
    pub fn has_record(self) -> bool {
        matches!(self, Self::Notebook)
    }
}

/// Where a tier's folder lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderLayout {
    /// `<project>/<child pretty type>s` (root only)
    ProjectRoot,
    /// `<parent folder>/<name>`
    Nested,
    /// Same folder as the parent
    ParentFolder,
    /// `<grandparent folder>/<own id>/<parent id>`
    Technique,
}

impl FolderLayout {
    /// Lowest rank this layout can be used at
    #[must_use]
    pub fn min_rank(self) -> usize {
        match self {
            Self::ProjectRoot => 0,
            Self::Nested | Self::ParentFolder => 1,
            Self::Technique => 2,
        }
    }

    /// Layout name for diagnostics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectRoot => "ProjectRoot",
            Self::Nested => "Nested",
            Self::ParentFolder => "ParentFolder",
            Self::Technique => "Technique",
        }
    }
}

/// How instances are discovered under a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listing {
    /// `*.json` files in the parent folder's meta sub-folder
    MetaFiles,
    /// Directories in the parent folder
    Subfolders,
    /// One candidate per technique folder of the grandparent, kept if set up
    Techniques,
}

/// Static description of one tier kind
#[derive(Debug)]
pub struct TierKind {
    pretty_type: String,
    short_type: String,
    name_part: Option<NamePart>,
    storage: Storage,
    layout: FolderLayout,
    listing: Listing,
    fields: Arc<FieldSet>,
    schema: OnceCell<Arc<Schema>>,
}

impl TierKind {
    /// Start declaring a kind
    #[must_use]
    pub fn builder(pretty_type: impl Into<String>) -> TierKindBuilder {
        TierKindBuilder::new(pretty_type)
    }

    /// Display name, e.g. `WorkPackage`
    #[inline]
    #[must_use]
    pub fn pretty_type(&self) -> &str {
        &self.pretty_type
    }

    /// Programmatic name, e.g. `wp`
    #[inline]
    #[must_use]
    pub fn short_type(&self) -> &str {
        &self.short_type
    }

    /// Name segment grammar; `None` for the root kind
    #[inline]
    #[must_use]
    pub fn name_part(&self) -> Option<&NamePart> {
        self.name_part.as_ref()
    }

    /// On-disk artifacts
    #[inline]
    #[must_use]
    pub fn storage(&self) -> Storage {
        self.storage
    }

    /// Folder placement
    #[inline]
    #[must_use]
    pub fn layout(&self) -> FolderLayout {
        self.layout
    }

    /// Discovery rule
    #[inline]
    #[must_use]
    pub fn listing(&self) -> Listing {
        self.listing
    }

    /// Declared meta fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Arc<FieldSet> {
        &self.fields
    }

    /// Aggregated meta schema, built and compiled on first use, then reused
    ///
    /// # Errors
    /// `SchemaError` if the declared field sets conflict or the generated
    /// JSON Schema does not compile.
    pub fn schema(&self) -> Result<Arc<Schema>, SchemaError> {
        self.schema
            .get_or_try_init(|| {
                self.fields
                    .build_schema(format!("{}Meta", self.pretty_type))
                    .map(Arc::new)
            })
            .cloned()
    }

    /// True when `name` equals the pretty or short type (case-insensitive)
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.pretty_type.eq_ignore_ascii_case(name) || self.short_type.eq_ignore_ascii_case(name)
    }
}

impl Display for TierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_type)
    }
}

/// Pretty type lower-cased with vowels removed: `WorkPackage` → `wrkpckg`
#[must_use]
pub fn default_short_type(pretty_type: &str) -> String {
    pretty_type
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
        .collect()
}

/// Builder for [`TierKind`]
#[derive(Debug)]
pub struct TierKindBuilder {
    pretty_type: String,
    short_type: Option<String>,
    template: Option<String>,
    pattern: Option<String>,
    id_regex: String,
    storage: Storage,
    layout: FolderLayout,
    listing: Listing,
    fields: Option<Arc<FieldSet>>,
}

impl TierKindBuilder {
    /// Defaults: notebook storage, nested folder, discovered by meta files
    #[must_use]
    pub fn new(pretty_type: impl Into<String>) -> Self {
        Self {
            pretty_type: pretty_type.into(),
            short_type: None,
            template: None,
            pattern: None,
            id_regex: DEFAULT_ID_REGEX.to_owned(),
            storage: Storage::Notebook,
            layout: FolderLayout::Nested,
            listing: Listing::MetaFiles,
            fields: None,
        }
    }

    /// With short type
    #[must_use]
    pub fn short_type(mut self, short_type: impl Into<String>) -> Self {
        self.short_type = Some(short_type.into());
        self
    }

    /// With name template
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// With explicit name pattern (overrides the id regex)
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// With identifier capture group for the default pattern
    #[must_use]
    pub fn id_regex(mut self, id_regex: impl Into<String>) -> Self {
        self.id_regex = id_regex.into();
        self
    }

    /// With storage
    #[must_use]
    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    /// With folder layout
    #[must_use]
    pub fn layout(mut self, layout: FolderLayout) -> Self {
        self.layout = layout;
        self
    }

    /// With listing rule
    #[must_use]
    pub fn listing(mut self, listing: Listing) -> Self {
        self.listing = listing;
        self
    }

    /// With declared meta fields
    #[must_use]
    pub fn fields(mut self, fields: Arc<FieldSet>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Finish the declaration
    ///
    /// A kind without a template is a root kind.
    ///
    /// # Errors
    /// Template and pattern errors from [`NamePart`].
    pub fn build(self) -> Result<TierKind, HierarchyError> {
        let name_part = match (self.template, self.pattern) {
            (Some(template), Some(pattern)) => Some(NamePart::new(template, pattern)?),
            (Some(template), None) => Some(NamePart::from_id_regex(template, &self.id_regex)?),
            (None, _) => None,
        };
        let short_type = self
            .short_type
            .unwrap_or_else(|| default_short_type(&self.pretty_type));
        let fields = self
            .fields
            .unwrap_or_else(|| Arc::new(FieldSet::new(self.pretty_type.clone())));
        Ok(TierKind {
            pretty_type: self.pretty_type,
            short_type,
            name_part,
            storage: self.storage,
            layout: self.layout,
            listing: self.listing,
            fields,
            schema: OnceCell::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_meta::{FieldSpec, FieldType};

    #[test]
    fn short_type_drops_vowels() {
        assert_eq!(default_short_type("WorkPackage"), "wrkpckg");
        assert_eq!(default_short_type("Sample"), "smpl");
        assert_eq!(default_short_type("DataSet"), "dtst");
    }

    #[test]
    fn builder_derives_pattern_and_short_type() {
        let kind = TierKind::builder("Chapter").template("Ch{}").build().unwrap();
        assert_eq!(kind.short_type(), "chptr");
        assert_eq!(kind.name_part().unwrap().pattern(), r"Ch(\d+)");
        assert!(kind.answers_to("chapter"));
        assert!(kind.answers_to("CHPTR"));
    }

    #[test]
    fn root_kind_has_no_name_part() {
        let home = TierKind::builder("Home")
            .storage(Storage::Home)
            .layout(FolderLayout::ProjectRoot)
            .build()
            .unwrap();
        assert!(home.name_part().is_none());
        assert!(!home.storage().has_record());
    }

    #[test]
    fn schema_is_built_once() {
        let fields = Arc::new(FieldSet::new("Page").field(FieldSpec::new("words", FieldType::Integer)));
        let kind = TierKind::builder("Page").template("p{}").fields(fields).build().unwrap();
        let first = kind.schema().unwrap();
        let second = kind.schema().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "PageMeta");
        assert_eq!(
            first.json_schema(strata_meta::Validation::Strict)["properties"]["words"],
            serde_json::json!({"type": "integer"})
        );
    }

    #[test]
    fn conflicting_schema_is_reported() {
        let base = Arc::new(FieldSet::new("Base").field(FieldSpec::new("x", FieldType::String)));
        let fields = Arc::new(
            FieldSet::new("Leaf")
                .field(FieldSpec::new("x", FieldType::Integer))
                .include(base),
        );
        let kind = TierKind::builder("Leaf").template("L{}").fields(fields).build().unwrap();
        assert!(kind.schema().is_err());
    }
}
