//! Standard paths used by pomobar

use std::path::{Path, PathBuf};

/// Standard pomobar paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Data directory (~/.local/share/pomobar)
    pub data: PathBuf,
    /// Config directory (~/.config/pomobar)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("pomobar");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pomobar");

        Self { data, config }
    }

    /// Root both directories under a single base (tests, portable installs)
    pub fn with_base(base: &Path) -> Self {
        Self {
            data: base.join("data"),
            config: base.join("config"),
        }
    }

    /// Key-value preference file (durations, goal, today's count)
    pub fn preferences_file(&self) -> PathBuf {
        self.config.join("preferences.json")
    }

    /// Runtime configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Task list file
    pub fn tasks_file(&self) -> PathBuf {
        self.data.join("tasks.json")
    }
}
