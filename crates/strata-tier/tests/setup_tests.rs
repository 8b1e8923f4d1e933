use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use strata_test_utils::TestProject;
use strata_tier::highlights::DisplayPayload;
use strata_tier::{SetupOptions, TierError};

#[test]
fn test_setup_project_creates_home_and_templates() {
    let project = TestProject::new();
    let home = project.setup_project().unwrap();

    assert!(home.exists());
    assert!(project.path().join("Home.ipynb").is_file());
    assert!(project.path().join("WorkPackages").is_dir());
    for kind in ["WorkPackage", "Experiment", "Sample"] {
        let template = project.path().join("templates").join(kind).join(format!("{kind}.tmplt.ipynb"));
        assert!(template.is_file(), "missing {}", template.display());
    }
    assert!(!project.path().join("templates/DataSet").exists());

    // second call is a no-op
    let again = project.setup_project().unwrap();
    assert!(std::sync::Arc::ptr_eq(&home, &again));
}

#[test]
fn test_notebook_setup_writes_meta_and_notebook() {
    let project = TestProject::new();
    project.setup_project().unwrap();
    let wp = project.resolve("WP1").unwrap();
    assert!(!wp.exists());

    project
        .setup_files(&wp, SetupOptions::new().with_meta("description", json!("pilot")))
        .unwrap();

    assert!(wp.exists());
    assert_eq!(wp.description().unwrap().as_deref(), Some("pilot"));
    assert!(wp.started().unwrap().is_some());
    let notebook = fs::read_to_string(wp.file().unwrap()).unwrap();
    assert!(notebook.contains("# WP1"));

    let err = project.setup_files(&wp, SetupOptions::new()).unwrap_err();
    assert!(err.is_already_exists());
}

#[test]
fn test_failed_setup_rolls_back() {
    let project = TestProject::new();
    project.setup_project().unwrap();
    let wp = project.resolve("WP2").unwrap();
    let meta_folder = wp.meta_file().unwrap().parent().unwrap().to_path_buf();
    // a file squatting on the tier folder path fails the last step
    fs::write(wp.folder(), "").unwrap();
    assert!(!meta_folder.exists());

    let err = project.setup_files(&wp, SetupOptions::new()).unwrap_err();
    assert!(err.is_already_exists());
    assert!(!wp.meta_file().unwrap().exists());
    assert!(!wp.file().unwrap().exists());
    assert!(!meta_folder.exists());
    assert!(wp.folder().is_file());
    assert_eq!(wp.started().unwrap(), None);
}

#[test]
fn test_invalid_initial_meta_creates_nothing() {
    let project = TestProject::new();
    project.setup_project().unwrap();
    let wp = project.resolve("WP3").unwrap();

    let err = project
        .setup_files(&wp, SetupOptions::new().with_meta("description", json!(42)))
        .unwrap_err();
    assert!(matches!(err, TierError::Meta(ref e) if e.is_validation()));
    assert!(!wp.meta_file().unwrap().exists());
    assert!(!wp.file().unwrap().exists());
    assert_eq!(wp.description().unwrap(), None);
}

#[test]
fn test_children_follow_listing_rules() {
    let project = TestProject::new();
    project.create("WP1.1a-scan").unwrap();
    project.create("WP1.1b").unwrap();
    project.create("WP1.2").unwrap();
    project.create("WP2").unwrap();

    let home = project.home().unwrap();
    let wps: Vec<_> = project.children(&home).unwrap().iter().map(|t| t.name().to_owned()).collect();
    assert_eq!(wps, ["WP1", "WP2"]);

    let wp1 = project.resolve("WP1").unwrap();
    let exps: Vec<_> = project.children(&wp1).unwrap().iter().map(|t| t.name().to_owned()).collect();
    assert_eq!(exps, ["WP1.1", "WP1.2"]);

    let exp = project.resolve("WP1.1").unwrap();
    let samples: Vec<_> = project.children(&exp).unwrap().iter().map(|t| t.name().to_owned()).collect();
    assert_eq!(samples, ["WP1.1a", "WP1.1b"]);

    // technique folder exists for both samples, data set only for `a`
    assert_eq!(project.techniques(&exp).unwrap(), ["scan"]);
    let a = project.resolve("WP1.1a").unwrap();
    let b = project.resolve("WP1.1b").unwrap();
    let sets: Vec<_> = project.children(&a).unwrap().iter().map(|t| t.name().to_owned()).collect();
    assert_eq!(sets, ["WP1.1a-scan"]);
    assert!(project.children(&b).unwrap().is_empty());

    let dataset = project.resolve("WP1.1a-scan").unwrap();
    assert!(matches!(
        project.children(&dataset).unwrap_err(),
        TierError::NoChildKind { .. }
    ));
    assert!(matches!(
        project.siblings(&home).unwrap_err(),
        TierError::NoSiblings { .. }
    ));
    assert_eq!(project.siblings(&wp1).unwrap().len(), 2);
}

#[test]
fn test_children_skip_foreign_entries() {
    let project = TestProject::new();
    let wp = project.create("WP1").unwrap();
    let meta_folder = wp.meta_file().unwrap().parent().unwrap().to_path_buf();
    fs::write(meta_folder.join("notes.json"), "{}").unwrap();
    fs::write(meta_folder.join("WP1.hlts"), "{}").unwrap();

    let home = project.home().unwrap();
    let names: Vec<_> = project.children(&home).unwrap().iter().map(|t| t.name().to_owned()).collect();
    assert_eq!(names, ["WP1"]);
}

#[test]
fn test_technique_setup() {
    let project = TestProject::new();
    let exp = project.create("WP4.1").unwrap();
    let path = project.setup_technique(&exp, "xrd").unwrap();
    assert!(path.is_dir());
    assert!(project.setup_technique(&exp, "xrd").unwrap_err().is_already_exists());
    fs::create_dir(exp.folder().join("_scratch")).unwrap();
    assert_eq!(project.techniques(&exp).unwrap(), ["xrd"]);
}

#[test]
fn test_folder_tier_setup_refuses_existing_folder() {
    let project = TestProject::new();
    let dataset = project.create("WP1.1a-xrd").unwrap();
    assert!(dataset.exists());
    let err = project.setup_files(&dataset, SetupOptions::new()).unwrap_err();
    assert!(err.is_already_exists());
}

#[test]
fn test_remove_files() {
    let project = TestProject::new();
    let wp = project.create("WP5").unwrap();
    wp.remove_files().unwrap();
    assert!(!wp.file().unwrap().exists());
    assert!(!wp.meta_file().unwrap().exists());
    assert!(wp.folder().exists());
    assert!(!wp.exists());
}

#[test]
fn test_explicit_template() {
    let project = TestProject::new();
    project.setup_project().unwrap();
    let custom = project.templates_folder().join("WorkPackage").join("lab.ipynb");
    fs::write(&custom, r#"{"title": "{{ tier.kind }} {{tier.id}}"}"#).unwrap();
    assert_eq!(project.templates("WorkPackage").unwrap().len(), 2);

    let wp = project.resolve("WP9").unwrap();
    project
        .setup_files(&wp, SetupOptions::new().with_template("WorkPackage/lab.ipynb"))
        .unwrap();
    assert_eq!(
        fs::read_to_string(wp.file().unwrap()).unwrap(),
        r#"{"title": "WorkPackage 9"}"#
    );

    let missing = project.resolve("WP10").unwrap();
    let err = project
        .setup_files(&missing, SetupOptions::new().with_template("nope.ipynb"))
        .unwrap_err();
    assert!(matches!(err, TierError::Io { .. }));
    assert!(!missing.meta_file().unwrap().exists());
}

#[test]
fn test_template_conditionals_and_short_type() {
    let project = TestProject::new();
    project.setup_project().unwrap();
    let custom = project.templates_folder().join("WorkPackage").join("run.ipynb");
    fs::write(
        &custom,
        r#"{"nine": "{{#if (eq tier.id "9")}}yes{{else}}no{{/if}}", "by": "{{wp.name}}", "about": "{{tier.meta.description}}"}"#,
    )
    .unwrap();

    for (name, nine) in [("WP9", "yes"), ("WP11", "no")] {
        let wp = project.resolve(name).unwrap();
        project
            .setup_files(
                &wp,
                SetupOptions::new()
                    .with_template("WorkPackage/run.ipynb")
                    .with_meta("description", json!("lab run")),
            )
            .unwrap();
        assert_eq!(
            fs::read_to_string(wp.file().unwrap()).unwrap(),
            format!(r#"{{"nine": "{nine}", "by": "{name}", "about": "lab run"}}"#)
        );
    }
}

#[test]
fn test_template_typo_is_an_error() {
    let project = TestProject::new();
    project.setup_project().unwrap();
    let custom = project.templates_folder().join("WorkPackage").join("typo.ipynb");
    fs::write(&custom, r#"{"title": "{{tier.nmae}}"}"#).unwrap();

    let wp = project.resolve("WP12").unwrap();
    let err = project
        .setup_files(&wp, SetupOptions::new().with_template("WorkPackage/typo.ipynb"))
        .unwrap_err();
    assert!(matches!(err, TierError::Template { ref tier, .. } if tier == "WP12"));
    assert!(!wp.meta_file().unwrap().exists());
    assert!(!wp.file().unwrap().exists());
}

#[test]
fn test_highlights() {
    let project = TestProject::new();
    let exp = project.create("WP1.3").unwrap();
    assert!(exp.highlights().unwrap().is_empty());

    let plot = DisplayPayload::new("text/plain", json!("<Figure>"));
    exp.add_highlight("Fig 1", vec![plot.clone()], false).unwrap();
    assert!(matches!(
        exp.add_highlight("Fig 1", vec![], false).unwrap_err(),
        TierError::HighlightExists { .. }
    ));
    exp.add_highlight("Fig 1", vec![plot.clone(), plot.clone()], true).unwrap();
    assert_eq!(exp.highlights().unwrap()["Fig 1"].len(), 2);

    let removed = exp.remove_highlight("Fig 1").unwrap();
    assert_eq!(removed, vec![plot.clone(), plot]);
    assert!(exp.highlights().unwrap().is_empty());
    assert!(matches!(
        exp.remove_highlight("Fig 1").unwrap_err(),
        TierError::NoHighlight { .. }
    ));

    let home = project.home().unwrap();
    assert!(home.highlights().unwrap().is_empty());
    assert!(home.add_highlight("x", vec![], true).is_err());
}

#[test]
fn test_highlights_keep_insertion_order() {
    let project = TestProject::new();
    let exp = project.create("WP1.4").unwrap();
    let plot = DisplayPayload::new("text/plain", json!("<Figure>"));
    for label in ["zeta", "alpha", "mid"] {
        exp.add_highlight(label, vec![plot.clone()], false).unwrap();
    }
    exp.add_highlight("alpha", vec![], true).unwrap();
    let labels: Vec<_> = exp.highlights().unwrap().keys().cloned().collect();
    assert_eq!(labels, ["zeta", "alpha", "mid"]);

    exp.remove_highlight("zeta").unwrap();
    let text = fs::read_to_string(exp.highlights_file().unwrap()).unwrap();
    assert!(text.find("\"alpha\"").unwrap() < text.find("\"mid\"").unwrap());
}

#[test]
fn test_meta_timeout_from_config() {
    let project = TestProject::uncached();
    let wp = project.create("WP6").unwrap();
    let file = wp.meta_file().unwrap();
    let mut record: serde_json::Value = serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
    record["conclusion"] = json!("edited elsewhere");
    fs::write(file, record.to_string()).unwrap();
    assert_eq!(wp.conclusion().unwrap().as_deref(), Some("edited elsewhere"));
}
