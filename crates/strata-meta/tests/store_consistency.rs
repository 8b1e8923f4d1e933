//! Disk/memory consistency of the record store

use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use strata_meta::prelude::*;
use tempfile::TempDir;

fn notebook_schema() -> Arc<Schema> {
    let schema = FieldSet::new("Notebook")
        .field(FieldSpec::new("description", FieldType::String).with_tag(FieldTag::Core))
        .field(FieldSpec::new("conclusion", FieldType::String).with_tag(FieldTag::Core))
        .field(FieldSpec::new("started", FieldType::DateTime).with_tag(FieldTag::Core))
        .build_schema("NotebookMeta")
        .unwrap();
    Arc::new(schema)
}

#[test]
fn rejected_set_leaves_file_byte_identical() {
    let dir = TempDir::new().unwrap();
    let meta = Meta::new(dir.path().join("WP1.json"), notebook_schema());
    meta.set("description", json!("first")).unwrap();
    let before = fs::read(meta.file()).unwrap();

    let err = meta.set("description", json!(5)).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.file(), meta.file());
    assert!(err.to_string().contains("WP1.json"));

    assert_eq!(fs::read(meta.file()).unwrap(), before);
    assert_eq!(meta.get("description").unwrap(), json!("first"));
}

#[test]
fn malformed_file_keeps_previous_record() {
    let dir = TempDir::new().unwrap();
    let meta = Meta::new(dir.path().join("rec.json"), notebook_schema());
    meta.set("conclusion", json!("works")).unwrap();
    meta.fetch().unwrap();

    fs::write(meta.file(), "{not json").unwrap();
    assert!(matches!(meta.fetch().unwrap_err(), MetaError::Parse { .. }));

    fs::write(meta.file(), "[1, 2, 3]").unwrap();
    assert!(meta.fetch().unwrap_err().is_validation());

    fs::write(meta.file(), r#"{"started": "yesterday"}"#).unwrap();
    assert!(meta.fetch().unwrap_err().is_validation());

    meta.set_timeout(Duration::from_secs(3600));
    assert_eq!(meta.get("conclusion").unwrap(), json!("works"));
}

#[test]
fn zero_timeout_sees_external_edits() {
    let dir = TempDir::new().unwrap();
    let meta = Meta::new(dir.path().join("rec.json"), notebook_schema()).with_timeout(Duration::ZERO);
    meta.set("description", json!("mine")).unwrap();

    fs::write(meta.file(), r#"{"description":"theirs"}"#).unwrap();
    assert_eq!(meta.get("description").unwrap(), json!("theirs"));
}

#[test]
fn large_timeout_serves_cached_value() {
    let dir = TempDir::new().unwrap();
    let meta = Meta::new(dir.path().join("rec.json"), notebook_schema())
        .with_timeout(Duration::from_secs(3600));
    meta.set("description", json!("mine")).unwrap();
    meta.fetch().unwrap();

    fs::write(meta.file(), r#"{"description":"theirs"}"#).unwrap();
    assert_eq!(meta.get("description").unwrap(), json!("mine"));

    meta.fetch().unwrap();
    assert_eq!(meta.get("description").unwrap(), json!("theirs"));
}

#[test]
fn short_timeout_expires() {
    let dir = TempDir::new().unwrap();
    let meta = Meta::new(dir.path().join("rec.json"), notebook_schema())
        .with_timeout(Duration::from_millis(20));
    meta.set("description", json!("mine")).unwrap();
    meta.fetch().unwrap();

    fs::write(meta.file(), r#"{"description":"theirs"}"#).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(meta.get("description").unwrap(), json!("theirs"));
}

#[test]
fn accessors_share_one_store() {
    let description: Field<String> =
        Field::new("description", FieldType::String).tagged(FieldTag::Core);
    let started: Field<chrono::DateTime<chrono::Utc>> =
        Field::new("started", FieldType::DateTime).tagged(FieldTag::Core);

    let dir = TempDir::new().unwrap();
    let meta = Meta::new(dir.path().join("rec.json"), notebook_schema());
    let when = chrono::DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    description.set(&meta, "calibration run".into()).unwrap();
    started.set(&meta, when).unwrap();

    let reopened = Meta::new(meta.file(), notebook_schema());
    assert_eq!(description.get(&reopened).unwrap().as_deref(), Some("calibration run"));
    assert_eq!(started.get(&reopened).unwrap(), Some(when));
}
