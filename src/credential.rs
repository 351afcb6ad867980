//! API key storage.
//!
//! The key lives in a small JSON key-value file under the platform config
//! directory, under a single fixed entry. Persistence is best-effort: storage
//! failures are logged and otherwise ignored.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Storage key the API key is kept under.
pub const CREDENTIAL_KEY: &str = "gemini-api-key";

/// Environment variable overriding the storage file location.
pub const STORAGE_ENV_VAR: &str = "REPROMPT_STORAGE";

/// A non-empty API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a key, returning `None` for an empty string.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// The raw key.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A display form that only reveals the last four characters.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Persistent home of the API key.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored key, or `None` if none was ever saved.
    fn load(&self) -> Option<Credential>;

    /// Stores a key, replacing any previous one. An empty value clears.
    fn save(&self, value: &str);

    /// Removes the stored key.
    fn clear(&self);
}

/// In-memory store, for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Credential> {
        self.value.read().ok().and_then(|v| v.clone())
    }

    fn save(&self, value: &str) {
        if let Ok(mut slot) = self.value.write() {
            *slot = Credential::new(value);
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.value.write() {
            *slot = None;
        }
    }
}

/// Store backed by a JSON object file. Unrelated entries are preserved.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Uses the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `REPROMPT_STORAGE` if set, else `<config dir>/reprompt/storage.json`.
    pub fn from_env() -> Self {
        match std::env::var_os(STORAGE_ENV_VAR) {
            Some(p) if !p.is_empty() => Self::new(p),
            _ => Self::new(default_storage_path()),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read credential storage: {e}");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "credential storage is not a JSON object, ignoring it");
                Map::new()
            }
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) {
        if let Err(e) = self.try_write_entries(entries) {
            tracing::warn!(path = %self.path.display(), "failed to write credential storage: {e}");
        }
    }

    fn try_write_entries(&self, entries: &Map<String, Value>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Credential> {
        self.read_entries()
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .and_then(Credential::new)
    }

    fn save(&self, value: &str) {
        if value.is_empty() {
            return self.clear();
        }
        let mut entries = self.read_entries();
        entries.insert(CREDENTIAL_KEY.to_string(), Value::String(value.to_string()));
        self.write_entries(&entries);
        tracing::debug!(path = %self.path.display(), "API key saved");
    }

    fn clear(&self) {
        let mut entries = self.read_entries();
        if entries.remove(CREDENTIAL_KEY).is_some() {
            self.write_entries(&entries);
            tracing::debug!(path = %self.path.display(), "API key cleared");
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reprompt")
        .join("storage.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileCredentialStore {
        FileCredentialStore::new(dir.path().join("nested").join("storage.json"))
    }

    #[test]
    fn test_credential_rejects_empty() {
        assert!(Credential::new("").is_none());
        assert_eq!(Credential::new("abc").unwrap().expose(), "abc");
    }

    #[test]
    fn test_credential_masked_and_debug() {
        let key = Credential::new("AIzaSyExample1234").unwrap();
        assert_eq!(key.masked(), "*************1234");
        assert_eq!(Credential::new("abc").unwrap().masked(), "***");
        assert_eq!(format!("{key:?}"), "Credential([REDACTED])");
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().is_none());

        store.save("first");
        assert_eq!(store.load().unwrap().expose(), "first");
        store.save("second");
        assert_eq!(store.load().unwrap().expose(), "second");

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_memory_store_save_empty_clears() {
        let store = MemoryCredentialStore::new();
        store.save("key");
        store.save("");
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        store_in(&dir).save("persisted-key");

        let reopened = store_in(&dir);
        assert_eq!(reopened.load().unwrap().expose(), "persisted-key");

        reopened.clear();
        assert!(store_in(&dir).load().is_none());
    }

    #[test]
    fn test_file_store_save_empty_clears() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save("key");
        store.save("");
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_preserves_other_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.save("key");
        store.clear();

        let content: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content, serde_json::json!({ "theme": "dark" }));
    }

    #[test]
    fn test_file_store_malformed_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(store.load().is_none());

        store.save("fresh");
        assert_eq!(store.load().unwrap().expose(), "fresh");
    }

    #[test]
    fn test_file_store_unwritable_location_is_silent() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = FileCredentialStore::new(blocker.join("storage.json"));
        store.save("key");
        assert!(store.load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save("key");

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
