use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    undo: UndoConfig,
    #[serde(default)]
    view: ViewConfig,
    #[serde(default)]
    project: ProjectConfig,
}

#[derive(Deserialize, Default)]
struct UndoConfig {
    max_transactions: Option<usize>,
    coalesce_window_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct ViewConfig {
    processor_slots: Option<usize>,
    master_processor_slots: Option<usize>,
}

#[derive(Deserialize, Default)]
struct ProjectConfig {
    default_track_count: Option<usize>,
    create_master_track: Option<bool>,
}

pub struct Config {
    undo: UndoConfig,
    view: ViewConfig,
    project: ProjectConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Some(path) = user_config_path() {
            if path.exists() {
                config.merge_file(&path);
            }
        }
        config
    }

    /// Embedded defaults merged with an explicit file.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::default();
        config.merge_file(path);
        config
    }

    fn merge_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => self.merge(user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        if user.undo.max_transactions.is_some() {
            self.undo.max_transactions = user.undo.max_transactions;
        }
        if user.undo.coalesce_window_ms.is_some() {
            self.undo.coalesce_window_ms = user.undo.coalesce_window_ms;
        }
        if user.view.processor_slots.is_some() {
            self.view.processor_slots = user.view.processor_slots;
        }
        if user.view.master_processor_slots.is_some() {
            self.view.master_processor_slots = user.view.master_processor_slots;
        }
        if user.project.default_track_count.is_some() {
            self.project.default_track_count = user.project.default_track_count;
        }
        if user.project.create_master_track.is_some() {
            self.project.create_master_track = user.project.create_master_track;
        }
    }

    pub fn max_transactions(&self) -> usize {
        self.undo.max_transactions.unwrap_or(500).max(1)
    }

    /// `None` when transactions only end on explicit boundaries.
    pub fn coalesce_window(&self) -> Option<Duration> {
        match self.undo.coalesce_window_ms.unwrap_or(0) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Processor slots per regular track (clamped to 1..=128).
    pub fn processor_slots(&self) -> usize {
        self.view.processor_slots.unwrap_or(7).clamp(1, strata_types::MAX_SLOTS)
    }

    pub fn master_processor_slots(&self) -> usize {
        self.view
            .master_processor_slots
            .unwrap_or(8)
            .clamp(1, strata_types::MAX_SLOTS)
    }

    pub fn default_track_count(&self) -> usize {
        self.project.default_track_count.unwrap_or(1)
    }

    pub fn create_master_track(&self) -> bool {
        self.project.create_master_track.unwrap_or(true)
    }

    /// Override the starting layout of new projects.
    pub fn with_starting_tracks(mut self, count: usize, master: bool) -> Self {
        self.project.default_track_count = Some(count);
        self.project.create_master_track = Some(master);
        self
    }
}

/// Embedded defaults only.
impl Default for Config {
    fn default() -> Self {
        let base: ConfigFile = match toml::from_str(DEFAULT_CONFIG) {
            Ok(base) => base,
            Err(e) => {
                log::error!(target: "config", "embedded config.toml is invalid: {}", e);
                ConfigFile::default()
            }
        };
        Config {
            undo: base.undo,
            view: base.view,
            project: base.project,
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("strata").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults() {
        let config = Config::default();
        assert_eq!(config.max_transactions(), 500);
        assert_eq!(config.coalesce_window(), None);
        assert_eq!(config.processor_slots(), 7);
        assert_eq!(config.master_processor_slots(), 8);
        assert_eq!(config.default_track_count(), 1);
        assert!(config.create_master_track());
    }

    #[test]
    fn test_user_file_overrides_some_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[undo]\ncoalesce_window_ms = 250\n[view]\nprocessor_slots = 500").unwrap();
        let config = Config::load_from(file.path());
        assert_eq!(config.coalesce_window(), Some(Duration::from_millis(250)));
        assert_eq!(config.processor_slots(), strata_types::MAX_SLOTS);
        assert_eq!(config.master_processor_slots(), 8);
    }

    #[test]
    fn test_malformed_user_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[view\nprocessor_slots = ").unwrap();
        let config = Config::load_from(file.path());
        assert_eq!(config.processor_slots(), 7);
    }
}
