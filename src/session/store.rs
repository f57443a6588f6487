use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Reattachment handle persisted between CLI invocations.
///
/// `pid` is best-effort: Chromium re-executes itself on some platforms, so
/// the recorded id may not match the process actually serving CDP. Liveness
/// is always decided by probing the port, never by the pid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub cdp_port: u16,
    pub cdp_url: String,
    pub pid: Option<u32>,
}

/// Single-slot durable storage for the session handle.
///
/// The slot is last-writer-wins; concurrent invocations racing on
/// load/save are an accepted hazard for a single-user CLI.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Well-known location of the single session slot
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".webpilot")
            .join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored handle. A missing or unparseable file is absence,
    /// not an error.
    pub fn load(&self) -> Option<SessionHandle> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Overwrite the stored handle unconditionally.
    pub fn save(&self, handle: &SessionHandle) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(handle)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Remove the stored handle. Succeeds silently when nothing is stored.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(dir: &Path) -> SessionStore {
        SessionStore::new(dir.join("session.json"))
    }

    fn handle(port: u16, url: &str) -> SessionHandle {
        SessionHandle {
            cdp_port: port,
            cdp_url: url.to_string(),
            pid: Some(4242),
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        let saved = handle(9222, "ws://127.0.0.1:9222/devtools/browser/abc");
        store.save(&saved).unwrap();

        assert_eq!(store.load(), Some(saved));
    }

    #[test]
    fn load_missing_file_is_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        assert!(store.load().is_none());
    }

    #[test]
    fn load_malformed_file_is_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn save_overwrites_existing_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        store.save(&handle(9222, "ws://old")).unwrap();
        store.save(&handle(9333, "ws://new")).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.cdp_port, 9333);
        assert_eq!(loaded.cdp_url, "ws://new");
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("slot").join("session.json"));

        store.save(&handle(9222, "ws://somewhere")).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn clear_removes_stored_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        store.save(&handle(9222, "ws://somewhere")).unwrap();
        store.clear().unwrap();

        assert!(!store.path().exists());
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_empty_slot_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        store.clear().unwrap();
    }
}
