//! Durable key-value slots for the persisted session record.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "photocrm";

/// A named-record store. Implementations must be safe to share between
/// tasks; the session store calls them from whichever task mutates it.
pub trait SessionStorage: Send + Sync {
    /// Read a record, `None` if it was never written.
    fn read(&self, name: &str) -> Result<Option<String>>;

    fn write(&self, name: &str, contents: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;
}

/// One JSON file per record inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session record: {}", path.display()))?;
        Ok(Some(contents))
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        let path = self.record_path(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session record: {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Records kept in the OS keychain, one entry per record name.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, name: &str) -> Result<Entry> {
        Entry::new(&self.service, name).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match self.entry(name)?.get_password() {
            Ok(contents) => Ok(Some(contents)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        self.entry(name)?
            .set_password(contents)
            .context("Failed to store session in keychain")
    }

    fn remove(&self, name: &str) -> Result<()> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

/// In-process storage for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record before handing the storage to a store.
    pub fn with_record(name: &str, contents: &str) -> Self {
        let storage = Self::new();
        storage
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), contents.to_string());
        storage
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.records().get(name).cloned())
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        self.records().insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.records().remove(name);
        Ok(())
    }
}
