use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const MINUTES: &str = "Fronteira: Proposta n.º 12 aprovada por unanimidade. Fim do ponto.";

fn atas(dir: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("atas").into();
    cmd.current_dir(dir);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("ATAS_POLICY");
    cmd.env_remove("ATAS_WORKERS");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn annotations() -> Value {
    json!({"%FEATURE_STRUCTURES": [
        {"%ID": 1, "%TYPE": "uima.cas.Sofa", "sofaString": MINUTES},
        {"%ID": 2, "%TYPE": "custom.Span", "@sofa": 1, "begin": 0, "end": 9, "label": "Assunto", "Fronteira": "Fronteira Inicial"},
        {"%ID": 3, "%TYPE": "custom.Span", "@sofa": 1, "begin": 11, "end": 26, "label": "Assunto", "Tema": "Obras"},
        {"%ID": 4, "%TYPE": "custom.Span", "@sofa": 1, "begin": 11, "end": 26, "label": "Posicionamento", "Posicionamento": "Votação"},
        {"%ID": 5, "%TYPE": "custom.Span", "@sofa": 1, "begin": 36, "end": 51, "label": "Posicionamento", "Posicionamento": "Resultado"},
        {"%ID": 6, "%TYPE": "custom.Span", "@sofa": 1, "begin": 53, "end": 56, "label": "Assunto", "Fronteira": "Fronteira Final"},
        {"%ID": 7, "%TYPE": "custom.Relation", "@sofa": 1, "label": "resultado", "@Governor": 4, "@Dependent": 5, "resultado": "por unanimidade"},
        {"%ID": 8, "%TYPE": "custom.Span", "@sofa": 1, "begin": 24, "end": 26, "label": "Votação"}
    ]})
}

fn segments() -> Value {
    json!({
        "document_id": "Evora_cm_001",
        "segments": [
            {"segment_id": 1, "text": "Fronteira: Proposta n.º 12 aprovada", "start_pos": 0, "end_pos": 35},
            {"segment_id": 2, "text": " por unanimidade. Fim do ponto.", "start_pos": 35, "end_pos": 66}
        ]
    })
}

fn write(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, value.to_string()).unwrap();
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// A tempdir holding one annotation export. Returns (guard, export path).
fn export() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Evora_cm_001_2021-03-04.json");
    write(&path, &annotations());
    (tmp, path)
}

// --- Binary startup ---

#[test]
fn binary_runs() {
    let mut cmd: Command = cargo_bin_cmd!("atas").into();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("atas"));
}

// --- Parse ---

#[test]
fn parse_prints_analysis() {
    let (tmp, path) = export();

    let output = atas(tmp.path()).arg("parse").arg(&path).assert().success();

    let analysis: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(analysis["entities"].as_array().unwrap().len(), 3);
    assert_eq!(analysis["relations"][0]["arg1"], "T2");
    assert_eq!(analysis["sections"][0]["begin"], 9);
    assert_eq!(analysis["meta"]["municipality"], "Evora");
}

#[test]
fn parse_writes_output_file() {
    let (tmp, path) = export();
    let out = tmp.path().join("out").join("analysis.json");

    atas(tmp.path())
        .arg("parse")
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("3 entities"));

    assert_eq!(read(&out)["diagnostics"]["filtered"]["short_numeric"], 1);
}

#[test]
fn parse_applies_policy_file() {
    let (tmp, path) = export();
    let policy = tmp.path().join("policy.json");
    write(&policy, &json!({"min_numeric_chars": 2}));

    let output = atas(tmp.path())
        .args(["parse", "--policy"])
        .arg(&policy)
        .arg(&path)
        .assert()
        .success();

    let analysis: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(analysis["entities"].as_array().unwrap().len(), 4);
}

#[test]
fn parse_fails_without_text() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.json");
    write(&path, &json!({"%FEATURE_STRUCTURES": []}));

    atas(tmp.path())
        .arg("parse")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No usable text buffer"));
}

// --- Segments ---

#[test]
fn segments_writes_publication() {
    let (tmp, path) = export();
    let segments_file = tmp.path().join("Evora_cm_001_2021-03-04_annotations.json");
    write(&segments_file, &segments());
    let out = tmp.path().join("published.json");

    atas(tmp.path())
        .arg("segments")
        .arg("--segments-file")
        .arg(&segments_file)
        .arg("--annotations-file")
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("2 segments"));

    let published = read(&out);
    assert_eq!(published["dataset_info"]["version"], "2.0");
    assert_eq!(published["statistics"]["processed_segments"], 2);
    assert_eq!(published["segments"][1]["text_pt"], " por unanimidade. Fim do ponto.");
    assert_eq!(published["segments"][1]["entities"][0]["text"], "por unanimidade");
    assert_eq!(published["segments"][0]["document_id"], "Evora_cm_001");
}

// --- Batch ---

#[test]
fn batch_publishes_each_document() {
    let tmp = TempDir::new().unwrap();
    let segments_dir = tmp.path().join("segments");
    let annotations_dir = tmp.path().join("annotations");
    let output_dir = tmp.path().join("output");
    let muni = segments_dir.join("municipio_evora");

    write(&muni.join("Evora_cm_001_2021-03-04_annotations.json"), &segments());
    write(&muni.join("Evora_cm_002_2021-04-01_annotations.json"), &segments());
    write(&annotations_dir.join("Evora_cm_001_2021-03-04.json"), &annotations());
    write(
        &annotations_dir.join("Evora_cm_002_2021-04-01.json"),
        &json!({"%FEATURE_STRUCTURES": []}),
    );

    atas(tmp.path())
        .arg("batch")
        .arg("--segments-dir")
        .arg(&segments_dir)
        .arg("--annotations-dir")
        .arg(&annotations_dir)
        .arg("--output-dir")
        .arg(&output_dir)
        .args(["--workers", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 processed, 1 failed"));

    let published = output_dir.join("municipio_evora").join("Evora_cm_001.json");
    assert_eq!(read(&published)["statistics"]["total_segments"], 2);
    assert!(!output_dir.join("municipio_evora").join("Evora_cm_002.json").exists());

    let report = read(&output_dir.join("batch_report.json"));
    assert_eq!(report["processed_files"], 1);
    assert_eq!(report["failed_files"], 1);
    assert_eq!(report["documents"][0]["municipality"], "evora");
}

#[test]
fn batch_without_pairs_fails() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("segments")).unwrap();
    fs::create_dir_all(tmp.path().join("annotations")).unwrap();

    atas(tmp.path())
        .args([
            "batch",
            "--segments-dir",
            "segments",
            "--annotations-dir",
            "annotations",
            "--output-dir",
            "output",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching"));
}

// --- Votes ---

#[test]
fn votes_lists_consolidated_records() {
    let (tmp, path) = export();

    let output = atas(tmp.path()).arg("votes").arg(&path).assert().success();

    let votes: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(votes[0]["vote_text"], "Proposta n.º 12");
    assert_eq!(votes[0]["resultado"], "por unanimidade");
    assert_eq!(votes[0]["complete"], false);
}
