//! Record schemas
//!
//! A [`Schema`] is the validation model of one record store: a set of
//! declared fields ([`FieldSpec`]) plus an open catch-all. Undeclared keys
//! are legal as long as they hold JSON values, which every
//! [`serde_json::Value`] is by construction.
//!
//! The declared fields are turned into two JSON Schema documents, one per
//! [`Validation`] mode, and compiled once when the schema is built:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": {
//!     "description": {"type": ["string", "null"]},
//!     "started": {"type": ["string", "null"], "format": "date-time"}
//!   },
//!   "additionalProperties": true
//! }
//! ```

use crate::error::SchemaError;
use indexmap::IndexMap;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::{self, Debug, Display, Formatter};

/// Target JSON type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// JSON string
    String,
    /// JSON number without a fractional part
    Integer,
    /// Any JSON number
    Number,
    /// JSON boolean
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// String holding a timezone-aware RFC 3339 / ISO-8601 timestamp
    DateTime,
    /// Any JSON value, `null` included
    Any,
}

impl FieldType {
    /// Lowercase name used in messages and serialized schemas
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::DateTime => "datetime",
            Self::Any => "any",
        }
    }

    /// JSON Schema fragment for a property of this type
    ///
    /// Lax mode widens every type except [`FieldType::Any`] with `null`.
    #[must_use]
    pub fn json_schema(self, mode: Validation) -> Value {
        let name = match self {
            Self::Any => return json!({}),
            Self::DateTime => "string",
            other => other.as_str(),
        };
        let ty = match mode {
            Validation::Strict => json!(name),
            Validation::Lax => json!([name, "null"]),
        };
        match self {
            Self::DateTime => json!({"type": ty, "format": "date-time"}),
            _ => json!({"type": ty}),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification tag carried for downstream tooling
///
/// Has no effect on validation or storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTag {
    /// Reserved for fields the core itself manages (e.g. `started`)
    Core,
    /// Hidden from user-facing editors
    Private,
}

/// How strictly values are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Used for values being written: exact target types, no `null`
    #[default]
    Strict,
    /// Used for documents read from disk
    Lax,
}

/// One declared field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<FieldTag>,
}

impl FieldSpec {
    /// Declare a field with a `null` default and no tag
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: Value::Null,
            tag: None,
        }
    }

    /// With default value returned when the key is absent
    #[inline]
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    /// With classification tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: FieldTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target JSON type
    #[inline]
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Default value
    #[inline]
    #[must_use]
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// Classification tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<FieldTag> {
        self.tag
    }

    /// Two declarations are interchangeable when type and default agree
    #[inline]
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.field_type == other.field_type && self.default == other.default
    }
}

/// Reason a value or document was rejected by a [`Schema`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaViolation {
    /// Declared field holds a value of the wrong JSON type
    #[error("field '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: FieldType,
        found: &'static str,
    },

    /// Document root is not an object
    #[error("record must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// Value could not be represented as JSON at all
    #[error("field '{key}': not a valid JSON value ({reason})")]
    NotJson { key: String, reason: String },

    /// Any other rejection reported by the compiled schema
    #[error("field '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

/// Name of the JSON kind of `value`, for diagnostics
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct Compiled {
    document: Value,
    validator: JSONSchema,
}

impl Compiled {
    fn new(schema: &str, document: Value, draft: Draft) -> Result<Self, SchemaError> {
        let validator = JSONSchema::options()
            .with_draft(draft)
            .compile(&document)
            .map_err(|e| SchemaError::Compile {
                schema: schema.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            document,
            validator,
        })
    }
}

fn object_schema(fields: &IndexMap<String, FieldSpec>, mode: Validation) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, spec)| (name.clone(), spec.field_type().json_schema(mode)))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": true
    })
}

/// Top-level key an instance path points into, `None` for the root
fn top_level_key(instance_path: &str) -> Option<String> {
    let rest = instance_path.strip_prefix('/')?;
    let segment = rest.split('/').next().unwrap_or(rest);
    Some(segment.replace("~1", "/").replace("~0", "~"))
}

/// Aggregated validation model for one record store
///
/// Declared fields are checked against their [`FieldType`]; any other key
/// is accepted.
pub struct Schema {
    name: String,
    fields: IndexMap<String, FieldSpec>,
    strict: Compiled,
    lax: Compiled,
}

impl Schema {
    /// Schema with no declared fields (everything is open)
    ///
    /// # Errors
    /// `SchemaError::Compile` if the JSON Schema documents fail to compile.
    pub fn open(name: impl Into<String>) -> Result<Self, SchemaError> {
        Self::from_fields(name.into(), IndexMap::new())
    }

    pub(crate) fn from_fields(
        name: String,
        fields: IndexMap<String, FieldSpec>,
    ) -> Result<Self, SchemaError> {
        // Draft 4 keeps `integer` exact; later drafts count 3.0 as an integer.
        let strict = Compiled::new(&name, object_schema(&fields, Validation::Strict), Draft::Draft4)?;
        let lax = Compiled::new(&name, object_schema(&fields, Validation::Lax), Draft::Draft7)?;
        Ok(Self {
            name,
            fields,
            strict,
            lax,
        })
    }

    /// Schema name (usually `<Kind>Meta`)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field by name
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    /// Names of declared fields
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of declared fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when nothing is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON Schema document compiled for `mode`
    #[inline]
    #[must_use]
    pub fn json_schema(&self, mode: Validation) -> &Value {
        &self.compiled(mode).document
    }

    /// True if `value` equals the declared default of `key`
    #[must_use]
    pub fn is_default(&self, key: &str, value: &Value) -> bool {
        self.fields.get(key).is_some_and(|f| f.default() == value)
    }

    /// Validate a single value destined for `key`
    ///
    /// # Errors
    /// `SchemaViolation::TypeMismatch` if `key` is declared and `value`
    /// does not satisfy its type.
    pub fn validate_value(
        &self,
        key: &str,
        value: &Value,
        mode: Validation,
    ) -> Result<(), SchemaViolation> {
        if !self.fields.contains_key(key) {
            return Ok(());
        }
        let mut single = Map::new();
        single.insert(key.to_owned(), value.clone());
        self.check(&Value::Object(single), mode)
    }

    /// Validate every entry of a record
    ///
    /// # Errors
    /// First violation the compiled schema reports.
    pub fn validate_record(
        &self,
        record: &Map<String, Value>,
        mode: Validation,
    ) -> Result<(), SchemaViolation> {
        self.check(&Value::Object(record.clone()), mode)
    }

    /// Validate a whole document and unwrap its root object
    ///
    /// # Errors
    /// `SchemaViolation::NotAnObject` for non-object roots, otherwise as
    /// [`Schema::validate_record`].
    pub fn validate_document(
        &self,
        document: Value,
        mode: Validation,
    ) -> Result<Map<String, Value>, SchemaViolation> {
        self.check(&document, mode)?;
        match document {
            Value::Object(record) => Ok(record),
            other => Err(SchemaViolation::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    fn compiled(&self, mode: Validation) -> &Compiled {
        match mode {
            Validation::Strict => &self.strict,
            Validation::Lax => &self.lax,
        }
    }

    fn check(&self, instance: &Value, mode: Validation) -> Result<(), SchemaViolation> {
        match self.compiled(mode).validator.validate(instance) {
            Ok(()) => Ok(()),
            Err(mut errors) => errors.next().map_or(Ok(()), |e| Err(self.violation(&e))),
        }
    }

    fn violation(&self, error: &ValidationError<'_>) -> SchemaViolation {
        let found = json_kind(&error.instance);
        let Some(key) = top_level_key(&error.instance_path.to_string()) else {
            return SchemaViolation::NotAnObject { found };
        };
        match self.fields.get(&key) {
            Some(spec) => SchemaViolation::TypeMismatch {
                expected: spec.field_type(),
                key,
                found,
            },
            None => SchemaViolation::Rejected {
                reason: error.to_string(),
                key,
            },
        }
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
