//! Runtime configuration.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. `DOCSMITH_WORKING_DIR` overrides the working
//! directory after the file is read.

use crate::common::error::{Error, Result};
use crate::ooxml::docx::ProtectionOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "DOCSMITH_CONFIG";
/// Environment variable overriding [`Config::working_dir`].
pub const WORKING_DIR_ENV: &str = "DOCSMITH_WORKING_DIR";

/// PDF converter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Office program invoked for conversion
    pub program: String,
    pub timeout_secs: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            program: "soffice".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// The configured level as a filter; unknown names fall back to `info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory relative filenames are resolved against
    pub working_dir: PathBuf,
    pub protection: ProtectionOptions,
    pub pdf: PdfConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            protection: ProtectionOptions::default(),
            pdf: PdfConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(yaml).map_err(|e| Error::Config(format!("invalid configuration: {}", e)))
    }

    /// Load from `path`, else from the file named by `DOCSMITH_CONFIG`, else
    /// defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                log::debug!("configuration loaded from {}", path.display());
                Self::from_yaml(&text)?
            },
            None => Self::default(),
        };
        if let Some(dir) = std::env::var_os(WORKING_DIR_ENV) {
            config.working_dir = PathBuf::from(dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.protection.salt_len == 0 {
            return Err(Error::Config("protection.salt_len must be positive".to_string()));
        }
        if self.pdf.program.trim().is_empty() {
            return Err(Error::Config("pdf.program must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.protection.spin_count, 100_000);
        assert_eq!(config.protection.salt_len, 16);
        assert_eq!(config.pdf.timeout_secs, 120);
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "working_dir: /srv/docs\nprotection:\n  spin_count: 5000\npdf:\n  timeout_secs: 30\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.working_dir, PathBuf::from("/srv/docs"));
        assert_eq!(config.protection.spin_count, 5000);
        assert_eq!(config.protection.salt_len, 16);
        assert_eq!(config.pdf.program, "soffice");
        assert_eq!(config.pdf.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(Config::from_yaml("protection: [1, 2"), Err(Error::Config(_))));
        assert!(matches!(Config::from_yaml("pdf:\n  timeout_secs: soon\n"), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsmith.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Debug);

        let missing = Config::load(Some(&dir.path().join("nope.yaml")));
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
