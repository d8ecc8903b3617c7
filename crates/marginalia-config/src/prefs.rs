use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Theme::System => Theme::Light,
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
        }
    }
}

/// Viewer state that outlives a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPrefs {
    pub theme: Theme,
    pub wrap: bool,
    /// Show markdown as flowed markup instead of the raw grid.
    pub markup_preview: bool,
    /// Overrides the configured page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Directories expanded in the file picker, relative to the root.
    pub expanded_paths: BTreeSet<String>,
}

impl Default for ViewPrefs {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            wrap: false,
            markup_preview: true,
            page_size: None,
            expanded_paths: BTreeSet::new(),
        }
    }
}

impl ViewPrefs {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigReadError {
                config_path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
            config_path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

pub type PersistFn = Box<dyn FnMut(&ViewPrefs) -> anyhow::Result<()>>;

/// Scoped owner of [`ViewPrefs`]. Every mutation is handed to the persistence
/// callback; once closed, mutations are refused.
pub struct PrefsStore {
    prefs: ViewPrefs,
    persist: Option<PersistFn>,
}

impl PrefsStore {
    pub fn open(prefs: ViewPrefs, persist: PersistFn) -> Self {
        Self {
            prefs,
            persist: Some(persist),
        }
    }

    /// Open the prefs file at `path`, persisting back to it.
    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let prefs = ViewPrefs::load_from_path(&path)?;
        Ok(Self::open(
            prefs,
            Box::new(move |prefs: &ViewPrefs| prefs.save_to_path(&path)),
        ))
    }

    pub fn prefs(&self) -> &ViewPrefs {
        &self.prefs
    }

    pub fn is_open(&self) -> bool {
        self.persist.is_some()
    }

    /// End the scope and hand back the final state.
    pub fn close(&mut self) -> ViewPrefs {
        self.persist = None;
        self.prefs.clone()
    }

    /// Apply `change` and persist. Nothing is persisted when it leaves the
    /// prefs unchanged.
    pub fn update(&mut self, change: impl FnOnce(&mut ViewPrefs)) -> anyhow::Result<()> {
        let Some(persist) = self.persist.as_mut() else {
            anyhow::bail!("preferences store is closed");
        };
        let before = self.prefs.clone();
        change(&mut self.prefs);
        if self.prefs != before {
            persist(&self.prefs)?;
        }
        Ok(())
    }

    pub fn cycle_theme(&mut self) -> anyhow::Result<()> {
        self.update(|p| p.theme = p.theme.next())
    }

    pub fn toggle_wrap(&mut self) -> anyhow::Result<()> {
        self.update(|p| p.wrap = !p.wrap)
    }

    pub fn toggle_markup_preview(&mut self) -> anyhow::Result<()> {
        self.update(|p| p.markup_preview = !p.markup_preview)
    }

    pub fn toggle_expanded(&mut self, path: &str) -> anyhow::Result<()> {
        self.update(|p| {
            if !p.expanded_paths.remove(path) {
                p.expanded_paths.insert(path.to_string());
            }
        })
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.prefs.expanded_paths.contains(path)
    }
}
