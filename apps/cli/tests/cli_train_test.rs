//! Integration tests for `emotune train` and `emotune merge`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn emotune(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("emotune").unwrap();
    cmd.current_dir(temp_dir.path()).env("HOME", temp_dir.path());
    cmd
}

/// Prepare a one-record corpus with the mock engine.
fn prepare_corpus(temp_dir: &TempDir) -> std::path::PathBuf {
    let source = temp_dir.path().join("train.jsonl");
    fs::write(&source, "{\"text\":\"phew, finally done\",\"labels\":[23]}\n").unwrap();
    let corpus = temp_dir.path().join("corpus.jsonl");
    emotune(temp_dir)
        .arg("prepare")
        .arg("--source")
        .arg(&source)
        .args(["--mode", "full", "--engine", "mock", "--no-progress"])
        .arg("--output")
        .arg(&corpus)
        .assert()
        .success();
    corpus
}

#[test]
fn test_train_list_empty_workspace() {
    let temp_dir = TempDir::new().unwrap();
    emotune(&temp_dir)
        .args(["train", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No finished training jobs"));
}

#[test]
fn test_train_run_missing_dataset_fails() {
    let temp_dir = TempDir::new().unwrap();
    emotune(&temp_dir)
        .args(["train", "run", "--dataset", "missing.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to prepare training job"));
}

#[cfg(unix)]
#[test]
fn test_train_run_then_list() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = prepare_corpus(&temp_dir);
    fs::write(
        temp_dir.path().join("emotune.toml"),
        r#"
[train.command]
program = "sh"
args = ["-c", "cp \"$1\" \"$2/adapter_config.json\"", "trainer", "{job}", "{output_dir}"]
"#,
    )
    .unwrap();

    let output = emotune(&temp_dir).args(["train", "run", "--json", "--dataset"]).arg(&corpus).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let job_id = manifest["job_id"].as_str().unwrap().to_string();
    assert_eq!(manifest["examples"], 1);

    let output = emotune(&temp_dir).args(["train", "list", "--json"]).output().unwrap();
    let jobs: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["job_id"], job_id.as_str());
}

#[cfg(unix)]
#[test]
fn test_train_run_failing_command() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = prepare_corpus(&temp_dir);
    fs::write(temp_dir.path().join("emotune.toml"), "[train.command]\nprogram = \"false\"\n").unwrap();

    emotune(&temp_dir)
        .args(["train", "run", "--dataset"])
        .arg(&corpus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Training job failed"));
}

#[test]
fn test_merge_requires_adapter() {
    let temp_dir = TempDir::new().unwrap();
    emotune(&temp_dir)
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--adapter-dir or --job"));

    emotune(&temp_dir)
        .args(["merge", "--adapter-dir", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("adapter directory does not exist"));
}

#[cfg(unix)]
#[test]
fn test_merge_removes_shard_index() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("adapter")).unwrap();
    fs::write(
        temp_dir.path().join("emotune.toml"),
        r#"
[merge.command]
program = "sh"
args = ["-c", "touch \"$1/model.safetensors\" \"$1/model.safetensors.index.json\"", "merge", "{merged_dir}"]
"#,
    )
    .unwrap();

    emotune(&temp_dir)
        .args(["merge", "--adapter-dir", "adapter", "--output-dir", "merged"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed stale model.safetensors.index.json"));

    assert!(temp_dir.path().join("merged/model.safetensors").exists());
    assert!(!temp_dir.path().join("merged/model.safetensors.index.json").exists());
}

#[cfg(unix)]
#[test]
fn test_train_run_max_seconds_kills_command() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = prepare_corpus(&temp_dir);
    fs::write(
        temp_dir.path().join("emotune.toml"),
        "[train.command]\nprogram = \"sh\"\nargs = [\"-c\", \"exec sleep 5\"]\n",
    )
    .unwrap();

    emotune(&temp_dir)
        .args(["train", "run", "--max-seconds", "1", "--dataset"])
        .arg(&corpus)
        .timeout(std::time::Duration::from_secs(4))
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeded 1s"));
}
