//! Binary tests: run `yxf` as a subprocess
//!
//! Skipped during coverage builds.

#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const FORM: &str = r#"survey:
- type: text
  name: respondent
  label:
    English: Your name?
    French: Votre nom ?
- type: begin group
  name: visit
  children:
  - type: date
    name: visit_date
    label: Date of visit
- type: select_one yn
  name: consent
  label: Do you consent?
choices:
  yn:
  - name: y
    label: 'Yes'
  - name: n
    label: 'No'
settings:
  form_id: visit
"#;

fn yxf() -> Command {
    let mut cmd = Command::cargo_bin("yxf").unwrap();
    cmd.env_remove("YXF_TRANSLATABLE").env_remove("YXF_LOG");
    cmd
}

fn write_form(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("visit.yaml");
    fs::write(&path, FORM).unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_yaml_to_xlsx_and_back() {
    let dir = TempDir::new().unwrap();
    let yaml = write_form(&dir);

    yxf()
        .arg(&yaml)
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversion Complete"));
    let xlsx = dir.path().join("visit.xlsx");
    assert!(xlsx.exists());

    let back = dir.path().join("back.yaml");
    yxf().arg(&xlsx).arg("-o").arg(&back).assert().success();

    let text = fs::read_to_string(&back).unwrap();
    assert!(text.contains("Converted by yxf, from visit.yaml."));
    assert!(text.contains("visit_date"));
    assert!(text.contains("Votre nom ?"));
}

#[test]
fn test_markdown_flag() {
    let dir = TempDir::new().unwrap();
    let yaml = write_form(&dir);
    yxf().arg(&yaml).assert().success();

    yxf()
        .arg(dir.path().join("visit.xlsx"))
        .arg("--markdown")
        .assert()
        .success();

    let markdown = fs::read_to_string(dir.path().join("visit.md")).unwrap();
    assert!(markdown.starts_with("## survey\n"));
    assert!(markdown.contains("## choices"));
    assert!(markdown.contains("### yn"));

    // and back again
    let rebuilt = dir.path().join("rebuilt.xlsx");
    yxf()
        .arg(dir.path().join("visit.md"))
        .arg("--output")
        .arg(&rebuilt)
        .assert()
        .success();
    assert!(rebuilt.exists());
}

#[test]
fn test_markdown_chosen_by_output_extension() {
    let dir = TempDir::new().unwrap();
    let yaml = write_form(&dir);
    yxf().arg(&yaml).assert().success();

    let md = dir.path().join("out.md");
    yxf()
        .arg(dir.path().join("visit.xlsx"))
        .arg("-o")
        .arg(&md)
        .assert()
        .success();
    assert!(fs::read_to_string(&md).unwrap().contains("## survey"));
}

// ═══════════════════════════════════════════════════════════════════════════
// OVERWRITE GUARD
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_existing_output_requires_force() {
    let dir = TempDir::new().unwrap();
    let yaml = write_form(&dir);
    let xlsx = dir.path().join("visit.xlsx");
    fs::write(&xlsx, "placeholder").unwrap();

    yxf()
        .arg(&yaml)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "File already exists (use --force to override)",
        ));
    assert_eq!(fs::read_to_string(&xlsx).unwrap(), "placeholder");

    yxf().arg(&yaml).arg("--force").assert().success();
    assert_ne!(fs::read(&xlsx).unwrap(), b"placeholder");
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_unrecognized_extension() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("form.csv");
    fs::write(&csv, "type,name\n").unwrap();

    yxf()
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized file extension"));
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    yxf()
        .arg(dir.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to convert"));
    assert!(!dir.path().join("absent.xlsx").exists());
}

#[test]
fn test_structure_error_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("bad.yaml");
    fs::write(
        &yaml,
        "survey:\n- type: text\n  name: a\n  children:\n  - type: note\n",
    )
    .unwrap();

    yxf()
        .arg(&yaml)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Structure error"));
    assert!(!dir.path().join("bad.xlsx").exists());
}

#[test]
fn test_translatable_from_environment() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("custom.yaml");
    fs::write(
        &yaml,
        "survey:\n- type: text\n  name: q\n  prompt:\n    English: Name\n    Swahili: Jina\n",
    )
    .unwrap();

    // Without the extra column the translated prompt cannot be written out.
    yxf().arg(&yaml).assert().failure();

    yxf()
        .arg(&yaml)
        .env("YXF_TRANSLATABLE", "prompt")
        .assert()
        .success();
    assert!(dir.path().join("custom.xlsx").exists());
}

#[test]
fn test_help_mentions_directions() {
    yxf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--markdown"))
        .stdout(predicate::str::contains("--force"));
}
