use std::{fs, path::Path};

use anyhow::{Context, Result, bail};

use super::CommandResult;
use crate::config::{CONFIG_FILE_NAME, default_config_json};

/// Write a default config file into `dir`. An existing file is never overwritten.
pub fn init(dir: &Path) -> Result<CommandResult> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!("{} already exists", CONFIG_FILE_NAME);
    }

    fs::write(&config_path, default_config_json()?)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "created config file");

    Ok(CommandResult::init(true))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::config::load_config;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempdir().unwrap();
        let result = init(dir.path()).unwrap();
        assert_eq!(result.error_count, 0);

        let loaded = load_config(dir.path()).unwrap();
        assert!(loaded.from_file);
        assert!(loaded.config.custom_functions.is_empty());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        let err = init(dir.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap(),
            "{}"
        );
    }
}
