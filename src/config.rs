use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::NeedsbookError;

pub const CONFIG_FILE: &str = "needsbook.config";
const DATA_FILE: &str = "needs.db";

/// Optional settings read from `needsbook.config` in the working directory.
/// A minimal config would look like this:
///
/// ```toml
/// "data_file" = "/home/me/budget/needs.db"
/// "default_currency" = "EUR"
/// "decimal_sep" = ","
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NeedsbookConfig {
    pub data_file: Option<PathBuf>,
    /// Offered as the answer during setup.
    pub default_currency: Option<String>,
    pub decimal_sep: char,
}

impl Default for NeedsbookConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            default_currency: None,
            decimal_sep: '.',
        }
    }
}

impl NeedsbookConfig {
    pub fn from_toml(text: &str) -> Result<Self, NeedsbookError> {
        let config: Self = toml::from_str(text)?;
        if config.decimal_sep != '.' && config.decimal_sep != ',' {
            return Err(NeedsbookError::InvalidArgument(format!(
                "decimal_sep must be '.' or ',', got '{}'",
                config.decimal_sep
            )));
        }
        Ok(config)
    }

    /// Where the snapshot lives: the configured file, else the user's data
    /// directory, else the working directory.
    pub fn data_path(&self) -> PathBuf {
        if let Some(path) = &self.data_file {
            return path.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join("needsbook").join(DATA_FILE))
            .unwrap_or_else(|| PathBuf::from(DATA_FILE))
    }
}

pub fn load_config(dir: &Path) -> Result<NeedsbookConfig, NeedsbookError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(NeedsbookConfig::default());
    }
    info!(path = %config_path.display(), "config file found");
    let text = std::fs::read_to_string(config_path)?;
    NeedsbookConfig::from_toml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(NeedsbookConfig::from_toml("").unwrap(), NeedsbookConfig::default());
    }

    #[test]
    fn reads_all_fields() {
        let config = NeedsbookConfig::from_toml(
            r#"
"data_file" = "/tmp/budget/needs.db"
"default_currency" = "EUR"
"decimal_sep" = ","
"#,
        )
        .unwrap();
        assert_eq!(config.data_path(), PathBuf::from("/tmp/budget/needs.db"));
        assert_eq!(config.default_currency.as_deref(), Some("EUR"));
        assert_eq!(config.decimal_sep, ',');
    }

    #[test]
    fn rejects_unknown_keys_and_separators() {
        assert!(NeedsbookConfig::from_toml("currency = \"$\"").is_err());
        assert!(NeedsbookConfig::from_toml("decimal_sep = \";\"").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()).unwrap(), NeedsbookConfig::default());
    }

    #[test]
    fn file_in_directory_is_used() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "default_currency = \"JPY\"\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.default_currency.as_deref(), Some("JPY"));
        assert_eq!(config.decimal_sep, '.');
    }

    #[test]
    fn default_data_path_ends_with_file_name() {
        assert!(NeedsbookConfig::default().data_path().ends_with(DATA_FILE));
    }
}
