//! Typed field accessors
//!
//! A [`Field<T>`] names one key of a record store, carries its schema
//! declaration and converts between the stored JSON value and `T`.
//!
//! The conversion is a pair of plain functions. [`Field::new`] uses serde;
//! [`Field::with_codec`] lets the stored JSON type differ from `T`, e.g. a
//! duration kept as a number of seconds.

use crate::error::{MetaError, MetaResult};
use crate::schema::{FieldSpec, FieldTag, FieldType};
use crate::store::Meta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};

/// Turns a stored JSON value into `T`
pub type Decode<T> = fn(Value) -> Result<T, serde_json::Error>;

/// Turns `T` into the JSON value to store
pub type Encode<T> = fn(&T) -> Result<Value, serde_json::Error>;

/// Typed forwarding accessor onto a record store key
///
/// `on_read` runs after a stored value is decoded, `on_write` before a value
/// is encoded. Both default to the identity.
pub struct Field<T> {
    spec: FieldSpec,
    decode: Decode<T>,
    encode: Encode<T>,
    on_read: fn(T) -> T,
    on_write: fn(T) -> T,
}

fn identity<T>(value: T) -> T {
    value
}

fn serialize<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

impl<T: Serialize + DeserializeOwned> Field<T> {
    /// Accessor for `name` with a `null` default, stored through serde
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::with_codec(name, field_type, serde_json::from_value::<T>, serialize::<T>)
    }
}

impl<T> Field<T> {
    /// Accessor for `name` with explicit conversions to and from JSON
    #[must_use]
    pub fn with_codec(
        name: impl Into<String>,
        field_type: FieldType,
        decode: Decode<T>,
        encode: Encode<T>,
    ) -> Self {
        Self {
            spec: FieldSpec::new(name, field_type),
            decode,
            encode,
            on_read: identity::<T>,
            on_write: identity::<T>,
        }
    }

    /// With default value
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.spec = self.spec.with_default(default);
        self
    }

    /// With classification tag
    #[must_use]
    pub fn tagged(mut self, tag: FieldTag) -> Self {
        self.spec = self.spec.with_tag(tag);
        self
    }

    /// With transform applied to decoded values
    #[must_use]
    pub fn on_read(mut self, transform: fn(T) -> T) -> Self {
        self.on_read = transform;
        self
    }

    /// With transform applied before encoding
    #[must_use]
    pub fn on_write(mut self, transform: fn(T) -> T) -> Self {
        self.on_write = transform;
        self
    }

    /// Schema declaration of this field
    #[inline]
    #[must_use]
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Read the field from `store`
    ///
    /// Absent keys fall back to the declared default; `null` reads as `None`.
    ///
    /// # Errors
    /// Store errors, or `MetaError::Decode` if the value is not a `T`.
    pub fn get(&self, store: &Meta) -> MetaResult<Option<T>> {
        let raw = store.get_or(self.name(), self.spec.default().clone())?;
        if raw.is_null() {
            return Ok(None);
        }
        let value = (self.decode)(raw).map_err(|e| MetaError::decode(store.file(), self.name(), e))?;
        Ok(Some((self.on_read)(value)))
    }

    /// Write the field to `store`
    ///
    /// # Errors
    /// Validation or IO errors from [`Meta::set_encoded`].
    pub fn set(&self, store: &Meta, value: T) -> MetaResult<()> {
        let value = (self.on_write)(value);
        store.set_encoded(self.name(), (self.encode)(&value))
    }
}

impl<T> Debug for Field<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("spec", &self.spec).finish_non_exhaustive()
    }
}
