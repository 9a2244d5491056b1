//! Engine configuration
//!
//! A single JSON file, e.g.
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/mdr",
//!   "uid_prefix": "Term",
//!   "journal_sync": "fsync",
//!   "log_level": "info",
//!   "libraries": [{ "name": "Sponsor" }, { "name": "CDISC", "is_editable": false }]
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LifecycleError, LifecycleResult};
use crate::library::Library;
use crate::observability::Severity;
use crate::repository::journal::JournalSync;
use crate::repository::{FileRepositoryOptions, DEFAULT_UID_PREFIX};

/// Library provisioned by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySeed {
    pub name: String,
    #[serde(default = "default_editable")]
    pub is_editable: bool,
}

impl From<&LibrarySeed> for Library {
    fn from(seed: &LibrarySeed) -> Self {
        Library::new(seed.name.clone(), seed.is_editable)
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Data directory (required)
    pub data_dir: String,

    /// Prefix of generated uids (default "Item")
    #[serde(default = "default_uid_prefix")]
    pub uid_prefix: String,

    /// Journal durability (default "fsync")
    #[serde(default)]
    pub journal_sync: JournalSync,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Libraries provisioned by `init`
    #[serde(default)]
    pub libraries: Vec<LibrarySeed>,
}

fn default_editable() -> bool {
    true
}

fn default_uid_prefix() -> String {
    DEFAULT_UID_PREFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> LifecycleResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LifecycleError::InvalidInput(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> LifecycleResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)
            .map_err(|e| LifecycleError::InvalidInput(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a throwaway data directory
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.display().to_string(),
            uid_prefix: default_uid_prefix(),
            journal_sync: JournalSync::default(),
            log_level: default_log_level(),
            libraries: Vec::new(),
        }
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(LifecycleError::InvalidInput("data_dir must not be empty".into()));
        }

        let prefix_ok = !self.uid_prefix.is_empty()
            && self
                .uid_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !prefix_ok {
            return Err(LifecycleError::InvalidInput(format!(
                "Invalid uid_prefix: '{}'. Use ASCII letters, digits or '-'.",
                self.uid_prefix
            )));
        }

        self.log_severity()?;

        let mut seen = BTreeSet::new();
        for seed in &self.libraries {
            if seed.name.trim().is_empty() {
                return Err(LifecycleError::InvalidInput(
                    "library names must not be empty".into(),
                ));
            }
            if !seen.insert(seed.name.as_str()) {
                return Err(LifecycleError::InvalidInput(format!(
                    "library '{}' is listed twice",
                    seed.name
                )));
            }
        }
        Ok(())
    }

    pub fn log_severity(&self) -> LifecycleResult<Severity> {
        self.log_level.parse()
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// `<data_dir>/libraries.json`
    pub fn registry_path(&self) -> PathBuf {
        self.data_path().join("libraries.json")
    }

    pub fn repository_options(&self) -> FileRepositoryOptions {
        FileRepositoryOptions {
            uid_prefix: self.uid_prefix.clone(),
            sync: self.journal_sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json(r#"{"data_dir": "/tmp/mdr"}"#).unwrap();
        assert_eq!(config.uid_prefix, "Item");
        assert_eq!(config.journal_sync, JournalSync::Fsync);
        assert_eq!(config.log_severity().unwrap(), Severity::Info);
        assert!(config.libraries.is_empty());
        assert!(config.registry_path().ends_with("libraries.json"));
    }

    #[test]
    fn test_library_seeds() {
        let config = EngineConfig::from_json(
            r#"{"data_dir": "/tmp/mdr", "journal_sync": "none",
                "libraries": [{"name": "Sponsor"}, {"name": "CDISC", "is_editable": false}]}"#,
        )
        .unwrap();
        assert_eq!(config.journal_sync, JournalSync::None);
        let libraries: Vec<Library> = config.libraries.iter().map(Library::from).collect();
        assert_eq!(libraries[0], Library::new("Sponsor", true));
        assert_eq!(libraries[1], Library::new("CDISC", false));
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        for json in [
            r#"{}"#,
            r#"{"data_dir": ""}"#,
            r#"{"data_dir": "/tmp", "uid_prefix": "bad prefix"}"#,
            r#"{"data_dir": "/tmp", "log_level": "chatty"}"#,
            r#"{"data_dir": "/tmp", "journal_sync": "sometimes"}"#,
            r#"{"data_dir": "/tmp", "libraries": [{"name": "A"}, {"name": "A"}]}"#,
        ] {
            let err = EngineConfig::from_json(json).unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidInput(_)), "{}", json);
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mdr.json");
        fs::write(&path, r#"{"data_dir": "/tmp/mdr", "uid_prefix": "Term"}"#).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().uid_prefix, "Term");
        assert!(EngineConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
