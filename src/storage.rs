use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Persisted state keys. The client keeps exactly these three pieces of
/// durable local state; everything else lives server-side or in memory.
pub const KEY_ACCESS_TOKEN: &str = "token";
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub const KEY_TUTORIAL_SHOWN: &str = "tutorialShown";

/// Small key/value store for persisted client state.
///
/// Each key is independently readable, writable, and removable.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: one JSON object in the user's data directory.
pub struct FileStore {
    path: PathBuf,
    // Serialize writers; the file is rewritten whole on every mutation.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating state dir: {}", parent.display()))?;
        }
        Ok(Self { path, lock: Mutex::new(()) })
    }

    /// Default location: `state.json` under the project data directory.
    pub fn open_default() -> Result<Self> {
        let proj = ProjectDirs::from("dev", "medley", "medley")
            .context("unable to determine data directory for state file")?;
        let mut path = proj.data_dir().to_path_buf();
        path.push("state.json");
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if !text.trim().is_empty() => serde_json::from_str(&text)
                .with_context(|| format!("parsing state file: {}", self.path.display())),
            Ok(_) => Ok(BTreeMap::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).with_context(|| format!("reading state file: {}", self.path.display())),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let payload = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, payload)
            .with_context(|| format!("writing state file: {}", self.path.display()))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_values() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("state.json")).unwrap();

        assert_eq!(store.get(KEY_ACCESS_TOKEN).unwrap(), None);
        store.put(KEY_ACCESS_TOKEN, "abc").unwrap();
        store.put(KEY_REFRESH_TOKEN, "def").unwrap();
        assert_eq!(store.get(KEY_ACCESS_TOKEN).unwrap().as_deref(), Some("abc"));
        assert_eq!(store.get(KEY_REFRESH_TOKEN).unwrap().as_deref(), Some("def"));
    }

    #[test]
    fn keys_are_removed_independently() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("state.json")).unwrap();

        store.put(KEY_ACCESS_TOKEN, "abc").unwrap();
        store.put(KEY_TUTORIAL_SHOWN, "true").unwrap();
        store.remove(KEY_ACCESS_TOKEN).unwrap();
        assert_eq!(store.get(KEY_ACCESS_TOKEN).unwrap(), None);
        assert_eq!(store.get(KEY_TUTORIAL_SHOWN).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn empty_or_missing_file_reads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "").unwrap();
        let store = FileStore::open(path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
