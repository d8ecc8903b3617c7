pub mod prefs;

pub use prefs::{PrefsStore, Theme, ViewPrefs};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_FORWARD_TRIGGER_PX: f64 = 200.0;
pub const DEFAULT_BACKWARD_TRIGGER_PX: f64 = 80.0;
pub const DEFAULT_FULL_READ_LIMIT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub page_size: usize,
    pub forward_trigger_px: f64,
    pub backward_trigger_px: f64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            forward_trigger_px: DEFAULT_FORWARD_TRIGGER_PX,
            backward_trigger_px: DEFAULT_BACKWARD_TRIGGER_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub full_read_limit_bytes: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            full_read_limit_bytes: DEFAULT_FULL_READ_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory whose documents are browsed and annotated.
    pub root_path: PathBuf,
    /// Where annotations are stored; defaults to a file inside the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefs_file: Option<PathBuf>,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Config {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            annotations_file: None,
            prefs_file: None,
            paging: PagingConfig::default(),
            preview: PreviewConfig::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.root_path = Self::expand_path(&config.root_path).unwrap_or(config.root_path);
        config.annotations_file = config
            .annotations_file
            .map(|p| Self::expand_path(&p).unwrap_or(p));
        config.prefs_file = config.prefs_file.map(|p| Self::expand_path(&p).unwrap_or(p));
        if config.paging.page_size == 0 {
            log::warn!("Ignoring page_size = 0 in {}", config_path.display());
            config.paging.page_size = DEFAULT_PAGE_SIZE;
        }

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    fn config_dir() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/marginalia");
        PathBuf::from(config_dir.as_ref())
    }

    pub fn annotations_path(&self) -> PathBuf {
        self.annotations_file
            .clone()
            .unwrap_or_else(|| self.root_path.join(".marginalia").join("annotations.json"))
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.prefs_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("prefs.toml"))
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/marginalia/config.toml"));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(r#"root_path = "/srv/docs""#).unwrap();

        assert_eq!(config.paging, PagingConfig::default());
        assert_eq!(config.preview.full_read_limit_bytes, 5 * 1024 * 1024);
        assert_eq!(
            config.annotations_path(),
            PathBuf::from("/srv/docs/.marginalia/annotations.json")
        );
    }

    #[test]
    fn test_partial_paging_table() {
        let config: Config = toml::from_str(
            r#"
root_path = "/srv/docs"

[paging]
page_size = 250
"#,
        )
        .unwrap();

        assert_eq!(config.paging.page_size, 250);
        assert_eq!(config.paging.forward_trigger_px, DEFAULT_FORWARD_TRIGGER_PX);
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("MARGINALIA_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$MARGINALIA_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/subdir"));

        unsafe {
            env::remove_var("MARGINALIA_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(Path::new("~/test/path")).unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load_from_path(temp_dir.path().join("nonexistent.toml")).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "root_path = ").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_zero_page_size_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "root_path = \"/docs\"\n[paging]\npage_size = 0\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(config.paging.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::new("/tmp/test-docs");
        test_config.annotations_file = Some(PathBuf::from("/tmp/annotations.json"));
        test_config.paging.page_size = 300;

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
