//! Field sets and the schema builder
//!
//! Each tier kind statically declares the fields it adds and the field sets
//! it includes (its "bases"). [`FieldSet::build_schema`] flattens that graph
//! into one [`Schema`].

use crate::accessor::Field;
use crate::error::SchemaError;
use crate::schema::{FieldSpec, Schema};
use indexmap::IndexMap;
use std::sync::Arc;

/// Declared fields of one kind plus the sets it includes
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    name: String,
    fields: Vec<FieldSpec>,
    includes: Vec<Arc<FieldSet>>,
}

impl FieldSet {
    /// Empty field set
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// Add a raw field declaration
    #[inline]
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Add the declaration behind a typed accessor
    #[inline]
    #[must_use]
    pub fn declare<T>(self, accessor: &Field<T>) -> Self {
        self.field(accessor.spec().clone())
    }

    /// Include another set's fields (and, transitively, its includes)
    #[inline]
    #[must_use]
    pub fn include(mut self, base: Arc<FieldSet>) -> Self {
        self.includes.push(base);
        self
    }

    /// Set name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields declared directly on this set
    #[inline]
    #[must_use]
    pub fn own_fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Directly included sets
    #[inline]
    #[must_use]
    pub fn includes(&self) -> &[Arc<FieldSet>] {
        &self.includes
    }

    /// Aggregate this set and everything it includes into a schema named
    /// `schema_name`
    ///
    /// Own fields come first, then each include depth-first. A field
    /// declared more than once with the same type and default is kept once.
    ///
    /// # Errors
    /// `SchemaError::ConflictingField` when a name is declared with two
    /// different shapes, `SchemaError::Compile` if the resulting JSON
    /// Schema documents do not compile.
    pub fn build_schema(&self, schema_name: impl Into<String>) -> Result<Schema, SchemaError> {
        let schema_name = schema_name.into();
        let mut fields = IndexMap::new();
        self.collect(&schema_name, &mut fields)?;
        tracing::debug!(schema = %schema_name, fields = fields.len(), "built schema");
        Schema::from_fields(schema_name, fields)
    }

    fn collect(
        &self,
        schema_name: &str,
        out: &mut IndexMap<String, FieldSpec>,
    ) -> Result<(), SchemaError> {
        for spec in &self.fields {
            match out.get(spec.name()) {
                Some(existing) if existing.same_shape(spec) => {}
                Some(existing) => {
                    return Err(SchemaError::ConflictingField {
                        schema: schema_name.to_owned(),
                        field: spec.name().to_owned(),
                        first: Box::new(existing.clone()),
                        second: Box::new(spec.clone()),
                    })
                }
                None => {
                    out.insert(spec.name().to_owned(), spec.clone());
                }
            }
        }
        for base in &self.includes {
            base.collect(schema_name, out)?;
        }
        Ok(())
    }
}
