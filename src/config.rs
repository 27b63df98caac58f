use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Ok, Result, bail};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{custom::CustomSignature, syntax::Language};

pub const CONFIG_FILE_NAME: &str = ".trackscanrc.json";

pub const TEST_FILE_PATTERNS: &[&str] = &[
    "**/*_test.go",
    "**/*.test.tsx",
    "**/*.test.ts",
    "**/*.test.jsx",
    "**/*.test.js",
    "**/*.spec.tsx",
    "**/*.spec.ts",
    "**/*.spec.jsx",
    "**/*.spec.js",
    "**/__tests__/**",
    "**/testdata/**",
    "**/test_*.py",
    "**/*_test.py",
];

const LANGUAGES: [Language; 4] = [
    Language::Go,
    Language::JavaScript,
    Language::TypeScript,
    Language::Python,
];

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default)]
    pub ignore_test_files: bool,
    /// Custom tracking functions: `name` or `name(userId, EVENT_NAME, PROPERTIES)`.
    #[serde(default)]
    pub custom_functions: Vec<String>,
    /// Regexes matched against dotted callee names.
    #[serde(default)]
    pub custom_function_patterns: Vec<String>,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

fn default_languages() -> Vec<String> {
    LANGUAGES.iter().map(|l| l.as_str().to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            ignores: Vec::new(),
            ignore_test_files: false,
            custom_functions: Vec::new(),
            custom_function_patterns: Vec::new(),
            languages: default_languages(),
            jobs: None,
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Checks glob patterns, custom function signatures and patterns, the
    /// language list and the worker count.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Includes without wildcards are literal directory paths.
        for pattern in &self.includes {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'includes': \"{}\"", pattern)
                })?;
            }
        }

        for signature in &self.custom_functions {
            CustomSignature::parse(signature).context("Invalid entry in 'customFunctions'")?;
        }

        for pattern in &self.custom_function_patterns {
            Regex::new(pattern).with_context(|| {
                format!("Invalid regex in 'customFunctionPatterns': \"{}\"", pattern)
            })?;
        }

        for name in &self.languages {
            if !LANGUAGES.iter().any(|l| l.as_str() == name) {
                bail!(
                    "Unknown language in 'languages': \"{}\" (expected go, javascript, typescript or python)",
                    name
                );
            }
        }

        if self.jobs == Some(0) {
            bail!("'jobs' must be at least 1");
        }

        Ok(())
    }

    /// The languages enabled for scanning.
    pub fn enabled_languages(&self) -> Vec<Language> {
        LANGUAGES
            .into_iter()
            .filter(|l| self.languages.iter().any(|name| name == l.as_str()))
            .collect()
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}
