// Phase 8: CLI entry point tests
//
// Test PDFs are generated with lopdf; each test works in its own tempdir.

use std::path::Path;
use std::process::Command;

use lopdf::{Document, Object, Stream, dictionary};

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sku_splitter"))
}

/// Create a label PDF; each `Some(sku)` page carries the SKU in the default region.
fn create_label_pdf(path: &Path, labels: &[Option<&str>]) {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for label in labels {
        let content = match label {
            Some(sku) => format!("BT /F1 8 Tf 20 92 Td ({sku}) Tj ET"),
            None => "BT /F1 10 Tf 20 400 Td (CONTINUED) Tj ET".to_string(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => labels.len() as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(288),
                Object::Integer(432),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("failed to save test PDF");
}

fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).expect("failed to write file");
}

// ============================================================
// 1. No arguments shows usage and exits with failure
// ============================================================

#[test]
fn test_main_no_args_shows_usage() {
    let output = cargo_bin().output().expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure when no args given"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 2. --help flag shows usage and exits with success
// ============================================================

#[test]
fn test_main_help_flag() {
    let output = cargo_bin()
        .arg("--help")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --help"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 3. --version flag shows version and exits with success
// ============================================================

#[test]
fn test_main_version_flag() {
    let output = cargo_bin()
        .arg("--version")
        .output()
        .expect("failed to execute binary");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(env!("CARGO_PKG_VERSION")),
        "stderr should contain the version, got: {stderr}"
    );
}

// ============================================================
// 4. Nonexistent or invalid job files
// ============================================================

#[test]
fn test_main_nonexistent_job_file() {
    let output = cargo_bin()
        .arg("/nonexistent/path/to/jobs.yaml")
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "got: {stderr}");
}

#[test]
fn test_main_invalid_region_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jobs = dir.path().join("jobs.yaml");
    write_file(
        &jobs,
        r#"
jobs:
  - input: labels.pdf
    output: out
    region: { x0: 50, top: 0, x1: 10, bottom: 20 }
"#,
    );

    let output = cargo_bin().arg(&jobs).output().expect("failed to execute binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid"), "got: {stderr}");
}

// ============================================================
// 5. Full run: relative paths resolved against the job file
// ============================================================

#[test]
fn test_main_splits_labels_into_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    create_label_pdf(
        &dir.path().join("labels.pdf"),
        &[None, Some("SKU-1234"), None, Some("SKU-5678")],
    );
    let jobs = dir.path().join("jobs.yaml");
    write_file(
        &jobs,
        r#"
jobs:
  - input: labels.pdf
    output: split
"#,
    );

    let output = cargo_bin().arg(&jobs).output().expect("failed to execute binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("OK:"), "got: {stderr}");
    assert!(stderr.contains("(3 groups, 4 pages)"), "got: {stderr}");

    let out_dir = dir.path().join("split");
    assert!(out_dir.join("SKU-1234.pdf").exists());
    assert!(out_dir.join("SKU-5678.pdf").exists());
    assert!(out_dir.join("unidentified_pages.pdf").exists());
    assert!(out_dir.join("manifest.json").exists());
}

#[test]
fn test_main_settings_yaml_selects_zip() {
    let dir = tempfile::tempdir().expect("tempdir");
    create_label_pdf(&dir.path().join("labels.pdf"), &[Some("SKU-1234")]);
    write_file(&dir.path().join("settings.yaml"), "output_format: zip\n");
    let jobs = dir.path().join("jobs.yaml");
    write_file(
        &jobs,
        r#"
jobs:
  - input: labels.pdf
    output: labels.zip
"#,
    );

    let output = cargo_bin().arg(&jobs).output().expect("failed to execute binary");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("labels.zip").is_file());
}

#[test]
fn test_main_failed_job_sets_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    create_label_pdf(&dir.path().join("good.pdf"), &[Some("SKU-1234")]);
    let jobs = dir.path().join("jobs.yaml");
    write_file(
        &jobs,
        r#"
jobs:
  - input: missing.pdf
    output: out-missing
  - input: good.pdf
    output: out-good
"#,
    );

    let output = cargo_bin().arg(&jobs).output().expect("failed to execute binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "got: {stderr}");
    assert!(stderr.contains("OK:"), "second job should still run: {stderr}");
    assert!(dir.path().join("out-good").join("SKU-1234.pdf").exists());
}
