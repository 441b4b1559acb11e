//! Launching external training and merge tooling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tracing::info;

/// An external program plus argument templates.
///
/// Arguments may contain `{name}` placeholders, substituted per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    /// Default fine-tuning launcher.
    pub fn default_train() -> Self {
        Self::new(
            "python",
            &["train.py", "--job", "{job}", "--dataset", "{dataset}", "--output-dir", "{output_dir}", "--device", "{device}"],
        )
    }

    /// Default merge launcher.
    pub fn default_merge() -> Self {
        Self::new(
            "python",
            &["merge.py", "--base-model", "{base_model}", "--adapter-dir", "{adapter_dir}", "--output-dir", "{merged_dir}"],
        )
    }

    pub fn render_args(&self, vars: &[(&str, String)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| vars.iter().fold(arg.clone(), |acc, (key, value)| acc.replace(&format!("{{{key}}}"), value)))
            .collect()
    }

    /// Run to completion with inherited stdio.
    pub async fn run(&self, vars: &[(&str, String)]) -> std::io::Result<ExitStatus> {
        let args = self.render_args(vars);
        info!(program = %self.program, args = ?args, "Launching external command");

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        command.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let spec = CommandSpec::default_train();
        let args = spec.render_args(&[
            ("job", "/w/job.json".to_string()),
            ("dataset", "/w/formatted.jsonl".to_string()),
            ("output_dir", "/w/adapter".to_string()),
            ("device", "cuda".to_string()),
        ]);
        assert_eq!(
            args,
            vec![
                "train.py",
                "--job",
                "/w/job.json",
                "--dataset",
                "/w/formatted.jsonl",
                "--output-dir",
                "/w/adapter",
                "--device",
                "cuda"
            ]
        );
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        let spec = CommandSpec::new("echo", &["{job}-{other}"]);
        assert_eq!(spec.render_args(&[("job", "x".to_string())]), vec!["x-{other}"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_status() {
        assert!(CommandSpec::new("true", &[]).run(&[]).await.unwrap().success());
        assert!(!CommandSpec::new("false", &[]).run(&[]).await.unwrap().success());
    }
}
