//! LibraryRegistry - provisioned libraries and their editability
//!
//! Libraries are created once at provisioning. Toggling `is_editable` is an
//! administrative operation that lives here, outside the lifecycle engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::{Library, LibraryGate};
use crate::errors::{LifecycleError, LifecycleResult};

/// On-disk shape of the registry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    libraries: Vec<Library>,
}

/// Thread-safe registry of provisioned libraries.
#[derive(Debug, Default)]
pub struct LibraryRegistry {
    libraries: RwLock<BTreeMap<String, bool>>,
}

impl LibraryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a list of libraries.
    ///
    /// Duplicate names are rejected.
    pub fn with_libraries(libraries: impl IntoIterator<Item = Library>) -> LifecycleResult<Self> {
        let registry = Self::new();
        for library in libraries {
            registry.provision(library.name(), library.is_editable())?;
        }
        Ok(registry)
    }

    /// Provisions a new library.
    pub fn provision(&self, name: &str, is_editable: bool) -> LifecycleResult<Library> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::InvalidInput(
                "library name must not be empty".to_string(),
            ));
        }

        let mut libraries = self.write();
        if libraries.contains_key(name) {
            return Err(LifecycleError::LibraryExists(name.to_string()));
        }
        libraries.insert(name.to_string(), is_editable);
        Ok(Library::new(name, is_editable))
    }

    /// Changes the editability of an existing library.
    pub fn set_editable(&self, name: &str, is_editable: bool) -> LifecycleResult<Library> {
        let mut libraries = self.write();
        match libraries.get_mut(name) {
            Some(flag) => {
                *flag = is_editable;
                Ok(Library::new(name, is_editable))
            }
            None => Err(LifecycleError::LibraryNotFound(name.to_string())),
        }
    }

    /// Returns all libraries ordered by name.
    pub fn list(&self) -> Vec<Library> {
        self.read()
            .iter()
            .map(|(name, editable)| Library::new(name.clone(), *editable))
            .collect()
    }

    /// Loads a registry from a JSON file. A missing file yields an empty registry.
    pub fn load(path: &Path) -> LifecycleResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let file: RegistryFile = serde_json::from_str(&content)?;
        Self::with_libraries(file.libraries)
    }

    /// Persists the registry as JSON (write to a temp file, then rename).
    pub fn save(&self, path: &Path) -> LifecycleResult<()> {
        let file = RegistryFile {
            libraries: self.list(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, bool>> {
        self.libraries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, bool>> {
        self.libraries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl LibraryGate for LibraryRegistry {
    fn exists(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    fn find_by_name(&self, name: &str) -> LifecycleResult<Library> {
        self.read()
            .get(name)
            .map(|editable| Library::new(name, *editable))
            .ok_or_else(|| LifecycleError::LibraryNotFound(name.to_string()))
    }
}
