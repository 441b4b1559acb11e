//! Integration tests for `emotune prepare` and `emotune labels`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A command isolated from the caller's home directory and environment.
fn emotune(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("emotune").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env_remove("EMOTUNE_OLLAMA_URL")
        .env_remove("EMOTUNE_MODEL")
        .env_remove("EMOTUNE_ENGINE")
        .env_remove("EMOTUNE_WORKERS");
    cmd
}

fn write_source(temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("train.tsv");
    fs::write(
        &path,
        "I can't believe you remembered my birthday!\t15\ta1\n\
         This is the worst service ever\t2,3\ta2\n\
         Oh wow, I did not see that coming\t26\ta3\n\
         Fine, whatever\t27\ta4\n",
    )
    .unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    emotune(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("prepare"))
        .stdout(predicate::str::contains("labels"))
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("merge"));
}

#[test]
fn test_labels_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = emotune(&temp_dir).args(["labels", "--json"]).output().unwrap();
    assert!(output.status.success());

    let labels: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(labels.len(), 28);
    assert_eq!(labels[15]["name"], "gratitude");
    assert_eq!(labels[15]["polarity"], "Positive");
    assert_eq!(labels[16]["rank"], 0);
}

#[test]
fn test_labels_respects_config_override() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("emotune.toml"), "[taxonomy.polarity]\nsurprise = \"Positive\"\n").unwrap();

    let output = emotune(&temp_dir).args(["labels", "--json"]).output().unwrap();
    let labels: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(labels[26]["polarity"], "Positive");
}

#[test]
fn test_prepare_full_with_mock_engine() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir);
    let out = temp_dir.path().join("datasets").join("corpus.jsonl");

    let output = emotune(&temp_dir)
        .arg("prepare")
        .arg("--source")
        .arg(&source)
        .args(["--mode", "full", "--engine", "mock", "--json"])
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["selected"], 4);
    assert_eq!(report["emitted"], 4);
    assert_eq!(report["fallbacks"], 0);

    let corpus = fs::read_to_string(&out).unwrap();
    assert_eq!(corpus.lines().count(), 4);
    assert!(corpus.contains(r#"\"emotion\":\"Anger\""#));
}

#[test]
fn test_prepare_zero_limit_means_no_cap() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir);

    let output = emotune(&temp_dir)
        .arg("prepare")
        .arg("--source")
        .arg(&source)
        .args(["--mode", "full", "--limit", "0", "--engine", "mock", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["emitted"], 4);
}

#[test]
fn test_prepare_falls_back_when_ollama_is_down() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir);
    let out = temp_dir.path().join("corpus.jsonl");

    emotune(&temp_dir)
        .arg("prepare")
        .arg("--source")
        .arg(&source)
        .args(["--mode", "full", "--limit", "1", "--ollama-url", "http://127.0.0.1:9", "--timeout-secs", "2"])
        .arg("--output")
        .arg(&out)
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Corpus ready"));

    let line = fs::read_to_string(&out).unwrap();
    let record: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    let verdict: serde_json::Value = serde_json::from_str(record["output"].as_str().unwrap()).unwrap();
    assert_eq!(verdict["emotion"], "Gratitude");
    assert_eq!(verdict["polarity"], "Positive");
    assert_eq!(verdict["confidence_score"], 1.0);
    assert_eq!(verdict["reasoning"], "The text conveys gratitude.");
}

#[test]
fn test_prepare_balanced_rejects_invalid_label() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("bad.jsonl");
    fs::write(&source, "{\"text\":\"ok\",\"labels\":[1]}\n{\"text\":\"bad\",\"labels\":[40]}\n").unwrap();

    emotune(&temp_dir)
        .arg("prepare")
        .arg("--source")
        .arg(&source)
        .args(["--engine", "mock", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid label index 40"));
}

#[test]
fn test_prepare_requires_source() {
    let temp_dir = TempDir::new().unwrap();
    emotune(&temp_dir)
        .args(["prepare", "--engine", "mock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No source dataset given"));
}

#[test]
fn test_prepare_rejects_zero_workers() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir);
    emotune(&temp_dir)
        .arg("prepare")
        .arg("--source")
        .arg(&source)
        .args(["--engine", "mock", "--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}
