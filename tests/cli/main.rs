use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Ok, Result};
use insta_cmd::get_cargo_bin;
use serde_json::Value;
use tempfile::TempDir;

mod init;
mod scan;

const BIN_NAME: &str = "trackscan";

pub const GO_FIXTURE: &str = include_str!("../fixtures/go/main.go");
pub const JS_FIXTURE: &str = include_str!("../fixtures/javascript/main.js");
pub const PY_FIXTURE: &str = include_str!("../fixtures/python/main.py");

pub struct CliTest {
    _temp_dir: TempDir,
    project_dir: PathBuf,
}

impl CliTest {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().canonicalize()?;
        // Stop the config search at the project root.
        fs::create_dir(project_dir.join(".git"))?;
        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    pub fn with_file(path: &str, content: &str) -> Result<Self> {
        let test = Self::new()?;
        test.write_file(path, content)?;
        Ok(test)
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory:{}", parent.display()))?;
        }

        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write file: {}", file_path.display()))?;

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.project_dir
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(get_cargo_bin(BIN_NAME));
        cmd.current_dir(&self.project_dir);
        cmd.env_clear();
        cmd.env("NO_COLOR", "1"); // Disable colors for consistent test output
        cmd
    }

    pub fn scan_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("scan");
        cmd
    }

    /// Run `scan --format json` with extra arguments and parse stdout.
    pub fn scan_json(&self, args: &[&str]) -> Result<(Output, Value)> {
        let output = self
            .scan_command()
            .args(["--format", "json"])
            .args(args)
            .output()?;
        let json = serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "stdout is not JSON. stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            )
        })?;
        Ok((output, json))
    }

    pub fn read_file(&self, path: &str) -> Result<String> {
        let file_path = self.project_dir.join(path);
        fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))
    }
}

/// The first record with the given event name.
pub fn record<'a>(json: &'a Value, event: &str) -> Option<&'a Value> {
    json["records"]
        .as_array()?
        .iter()
        .find(|r| r["event"].as_str() == Some(event))
}
