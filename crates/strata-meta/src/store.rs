//! JSON-file-backed record store
//!
//! [`Meta`] mirrors one JSON document on disk. Reads go through an in-memory
//! copy that is refreshed once it is older than the store's timeout; every
//! successful mutation rewrites the whole file.
//!
//! ```text
//! Empty ──fetch──▶ Loaded ──(age >= timeout)──▶ Stale ──read──▶ Loaded
//! ```
//!
//! Writes are plain `fs::write` calls with no lock and no atomic rename. A
//! crash mid-write can leave a truncated file; concurrent writers from other
//! processes race and the last flush wins.

use crate::error::{MetaError, MetaResult, SchemaError};
use crate::schema::{Schema, SchemaViolation, Validation};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// JSON object as held in memory
pub type Record = Map<String, Value>;

#[derive(Debug)]
struct CacheState {
    record: Record,
    born: Option<Instant>,
    timeout: Duration,
}

impl CacheState {
    fn is_stale(&self) -> bool {
        self.born.map_or(true, |born| born.elapsed() >= self.timeout)
    }
}

/// Record store bound to one JSON file and one schema
#[derive(Debug)]
pub struct Meta {
    file: PathBuf,
    schema: Arc<Schema>,
    state: Mutex<CacheState>,
}

impl Meta {
    /// Staleness window used unless configured otherwise
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Bind a store to `file`; nothing is read until first access
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, schema: Arc<Schema>) -> Self {
        Self {
            file: file.into(),
            schema,
            state: Mutex::new(CacheState {
                record: Record::new(),
                born: None,
                timeout: Self::DEFAULT_TIMEOUT,
            }),
        }
    }

    /// Store with no declared fields
    ///
    /// # Errors
    /// `SchemaError::Compile` if the open schema fails to compile.
    pub fn open(file: impl Into<PathBuf>) -> Result<Self, SchemaError> {
        Ok(Self::new(file, Arc::new(Schema::open("MetaCache")?)))
    }

    /// With staleness timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.state.get_mut().timeout = timeout;
        self
    }

    /// Change the staleness timeout
    pub fn set_timeout(&self, timeout: Duration) {
        self.state.lock().timeout = timeout;
    }

    /// Current staleness timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.state.lock().timeout
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Validation schema
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Time since the last successful read, `None` before the first one
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        self.state.lock().born.map(|born| born.elapsed())
    }

    /// True if the backing file exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.file.is_file()
    }

    /// Force a read of the backing file
    ///
    /// A missing file leaves the record (and its age) as is. Any error also
    /// leaves the in-memory record untouched.
    ///
    /// # Errors
    /// `MetaError::Parse` for malformed JSON, `MetaError::Validation` for
    /// documents the schema rejects, `MetaError::Io` otherwise.
    pub fn fetch(&self) -> MetaResult<Record> {
        let mut state = self.state.lock();
        self.load(&mut state)?;
        Ok(state.record.clone())
    }

    /// Drop the cached record; the next access reads the file again
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.record.clear();
        state.born = None;
    }

    /// Re-read the file if the cached copy is stale
    ///
    /// # Errors
    /// As [`Meta::fetch`].
    pub fn refresh(&self) -> MetaResult<()> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)
    }

    /// Value stored under `key`, else the declared default
    ///
    /// # Errors
    /// `MetaError::KeyNotFound` when neither exists, or a refresh error.
    pub fn get(&self, key: &str) -> MetaResult<Value> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;
        if let Some(value) = state.record.get(key) {
            return Ok(value.clone());
        }
        self.schema
            .field(key)
            .map(|spec| spec.default().clone())
            .ok_or_else(|| MetaError::key_not_found(&self.file, key))
    }

    /// Like [`Meta::get`] but returns `default` instead of not-found
    ///
    /// # Errors
    /// Refresh errors.
    pub fn get_or(&self, key: &str, default: Value) -> MetaResult<Value> {
        match self.get(key) {
            Err(MetaError::KeyNotFound { .. }) => Ok(default),
            other => other,
        }
    }

    /// Validate `value` strictly, then store it and rewrite the file
    ///
    /// On failure neither memory nor disk changes.
    ///
    /// # Errors
    /// `MetaError::Validation` on type mismatch, refresh or IO errors.
    pub fn set(&self, key: &str, value: Value) -> MetaResult<()> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;
        self.schema
            .validate_value(key, &value, Validation::Strict)
            .map_err(|v| MetaError::validation(&self.file, v))?;

        let mut next = state.record.clone();
        next.insert(key.to_owned(), value);
        self.flush(&next)?;
        state.record = next;
        Ok(())
    }

    /// Serialize `value` and [`Meta::set`] it
    ///
    /// # Errors
    /// As [`Meta::set_encoded`].
    pub fn set_serialized<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> MetaResult<()> {
        self.set_encoded(key, serde_json::to_value(value))
    }

    /// Store the outcome of encoding a typed value
    ///
    /// A typed value that encodes to `null` is refused: serde turns
    /// non-finite floats into `null`, and `delete` is the way to clear a key.
    ///
    /// # Errors
    /// `MetaError::Validation` if encoding failed or produced `null`, else
    /// as [`Meta::set`].
    pub fn set_encoded(
        &self,
        key: &str,
        encoded: Result<Value, serde_json::Error>,
    ) -> MetaResult<()> {
        let not_json = |reason: String| {
            MetaError::validation(
                &self.file,
                SchemaViolation::NotJson {
                    key: key.to_owned(),
                    reason,
                },
            )
        };
        let value = encoded.map_err(|e| not_json(e.to_string()))?;
        if value.is_null() {
            warn!(file = %self.file.display(), key, "typed value encoded as null, not stored");
            return Err(not_json("encodes to null (non-finite number?)".to_owned()));
        }
        self.set(key, value)
    }

    /// Remove `key`, re-validate the remaining record and rewrite the file
    ///
    /// Returns the removed value.
    ///
    /// # Errors
    /// `MetaError::KeyNotFound` if `key` is not stored, validation, refresh
    /// or IO errors. The record is unchanged on error.
    pub fn delete(&self, key: &str) -> MetaResult<Value> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;

        let mut next = state.record.clone();
        let removed = next
            .shift_remove(key)
            .ok_or_else(|| MetaError::key_not_found(&self.file, key))?;
        self.schema
            .validate_record(&next, Validation::Lax)
            .map_err(|v| MetaError::validation(&self.file, v))?;
        self.flush(&next)?;
        state.record = next;
        Ok(removed)
    }

    /// Stored keys whose values differ from their declared default
    ///
    /// # Errors
    /// Refresh errors.
    pub fn keys(&self) -> MetaResult<Vec<String>> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;
        Ok(state
            .record
            .iter()
            .filter(|(k, v)| !self.schema.is_default(k, v))
            .map(|(k, _)| k.clone())
            .collect())
    }

    /// True if `key` is stored
    ///
    /// # Errors
    /// Refresh errors.
    pub fn contains_key(&self, key: &str) -> MetaResult<bool> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;
        Ok(state.record.contains_key(key))
    }

    /// Copy of the current record
    ///
    /// # Errors
    /// Refresh errors.
    pub fn snapshot(&self) -> MetaResult<Record> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)?;
        Ok(state.record.clone())
    }

    /// Write a brand-new document
    ///
    /// The parent directory must exist.
    ///
    /// # Errors
    /// `MetaError::AlreadyExists` if the file exists, validation or IO
    /// errors otherwise.
    pub fn create(&self, initial: Record) -> MetaResult<()> {
        if self.file.exists() {
            return Err(MetaError::AlreadyExists {
                file: self.file.clone(),
            });
        }
        self.schema
            .validate_record(&initial, Validation::Strict)
            .map_err(|v| MetaError::validation(&self.file, v))?;

        let mut state = self.state.lock();
        self.flush(&initial)?;
        state.record = initial;
        state.born = Some(Instant::now());
        Ok(())
    }

    fn refresh_locked(&self, state: &mut CacheState) -> MetaResult<()> {
        if state.is_stale() {
            self.load(state)?;
        }
        Ok(())
    }

    fn load(&self, state: &mut CacheState) -> MetaResult<()> {
        let text = match fs::read_to_string(&self.file) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(file = %self.file.display(), "no record file yet");
                return Ok(());
            }
            Err(e) => return Err(MetaError::io(&self.file, e)),
        };
        let document: Value =
            serde_json::from_str(&text).map_err(|e| MetaError::parse(&self.file, e))?;
        let record = self
            .schema
            .validate_document(document, Validation::Lax)
            .map_err(|v| MetaError::validation(&self.file, v))?;

        debug!(file = %self.file.display(), keys = record.len(), "loaded record");
        state.record = record;
        state.born = Some(Instant::now());
        Ok(())
    }

    fn flush(&self, record: &Record) -> MetaResult<()> {
        let persisted: Record = record
            .iter()
            .filter(|(k, v)| !self.schema.is_default(k, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let text = serde_json::to_string(&persisted).map_err(|e| MetaError::parse(&self.file, e))?;
        fs::write(&self.file, text).map_err(|e| MetaError::io(&self.file, e))?;
        debug!(file = %self.file.display(), keys = persisted.len(), "flushed record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldSet;
    use crate::schema::{FieldSpec, FieldType};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> Arc<Schema> {
        Arc::new(
            FieldSet::new("Test")
                .field(FieldSpec::new("title", FieldType::String))
                .field(FieldSpec::new("count", FieldType::Integer).with_default(json!(0)))
                .build_schema("TestMeta")
                .unwrap(),
        )
    }

    fn meta(dir: &TempDir) -> Meta {
        Meta::new(dir.path().join("record.json"), schema())
    }

    #[test]
    fn absent_file_is_empty_record() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        assert!(m.fetch().unwrap().is_empty());
        assert!(m.age().is_none());
        assert!(!m.exists());
    }

    #[test]
    fn get_falls_back_to_default_then_not_found() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        assert_eq!(m.get("count").unwrap(), json!(0));
        assert_eq!(m.get("title").unwrap(), Value::Null);
        assert!(m.get("missing").unwrap_err().is_not_found());
        assert_eq!(m.get_or("missing", json!("x")).unwrap(), json!("x"));
    }

    #[test]
    fn set_writes_compact_json_without_defaults() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        m.set("title", json!("scan")).unwrap();
        m.set("count", json!(0)).unwrap();
        m.set("extra", json!([1, 2])).unwrap();

        let text = fs::read_to_string(m.file()).unwrap();
        assert_eq!(text, r#"{"title":"scan","extra":[1,2]}"#);
        assert_eq!(m.keys().unwrap(), vec!["title".to_owned(), "extra".to_owned()]);
    }

    #[test]
    fn set_rejects_null_for_declared_field() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        assert!(m.set("title", Value::Null).unwrap_err().is_validation());
        assert!(!m.exists());
    }

    #[test]
    fn delete_removes_and_reports_absent() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        m.set("title", json!("a")).unwrap();
        assert_eq!(m.delete("title").unwrap(), json!("a"));
        assert!(!m.contains_key("title").unwrap());
        assert!(m.delete("title").unwrap_err().is_not_found());
        assert_eq!(fs::read_to_string(m.file()).unwrap(), "{}");
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        let mut initial = Record::new();
        initial.insert("title".into(), json!("first"));
        m.create(initial.clone()).unwrap();
        assert!(matches!(
            m.create(initial).unwrap_err(),
            MetaError::AlreadyExists { .. }
        ));
        assert_eq!(m.get("title").unwrap(), json!("first"));
    }

    #[test]
    fn lax_load_accepts_null_and_whole_floats() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        fs::write(m.file(), r#"{"title":null,"count":3.0}"#).unwrap();
        let record = m.fetch().unwrap();
        assert_eq!(record.get("count"), Some(&json!(3.0)));
        assert!(m.age().is_some());
    }

    #[test]
    fn timeout_builder_and_setter() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir).with_timeout(Duration::from_millis(5));
        assert_eq!(m.timeout(), Duration::from_millis(5));
        m.set_timeout(Duration::ZERO);
        assert_eq!(m.timeout(), Duration::ZERO);
    }

    #[test]
    fn delete_keeps_order_of_remaining_keys() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        for key in ["a", "b", "c", "d"] {
            m.set(key, json!(key)).unwrap();
        }
        m.delete("b").unwrap();
        assert_eq!(
            fs::read_to_string(m.file()).unwrap(),
            r#"{"a":"a","c":"c","d":"d"}"#
        );
        assert_eq!(m.keys().unwrap(), ["a", "c", "d"]);
    }

    #[test]
    fn non_finite_float_is_refused() {
        let dir = TempDir::new().unwrap();
        let m = meta(&dir);
        m.set("ratio", json!(0.5)).unwrap();

        let err = m.set_serialized("ratio", &f64::NAN).unwrap_err();
        assert!(matches!(
            err,
            MetaError::Validation { violation: SchemaViolation::NotJson { ref key, .. }, .. } if key == "ratio"
        ));
        assert!(m.set_serialized("ratio", &f64::INFINITY).is_err());
        assert_eq!(m.get("ratio").unwrap(), json!(0.5));
        assert_eq!(fs::read_to_string(m.file()).unwrap(), r#"{"ratio":0.5}"#);
    }

    #[test]
    fn open_store_accepts_any_key() {
        let dir = TempDir::new().unwrap();
        let m = Meta::open(dir.path().join("cache.json")).unwrap();
        assert!(m.schema().is_empty());
        m.set("anything", json!({"nested": [1, null]})).unwrap();
        assert_eq!(m.get("anything").unwrap()["nested"][1], Value::Null);
    }
}
