use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token file name in the data directory
const TOKEN_FILE: &str = "token.json";

/// Lifetime assumed when the server omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 120;

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

/// The persisted `{access_token, refresh_token}` pair.
///
/// Always written and removed as a whole; stores never hold half of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
            issued_at: Some(Utc::now()),
        }
    }

    /// Build the pair that replaces `self` after a successful refresh.
    /// The refresh token is kept unless the server rotated it.
    pub fn refreshed(&self, access_token: String, expires_in: u64, rotated: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token: rotated.or_else(|| self.refresh_token.clone()),
            expires_in,
            issued_at: Some(Utc::now()),
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Local estimate only; the server's 401 is what actually drives refresh.
    pub fn is_expired(&self) -> bool {
        match self.issued_at {
            Some(issued) => Utc::now() > issued + Duration::seconds(self.expires_in as i64),
            None => false,
        }
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.issued_at.map(|issued| {
            let expiry = issued + Duration::seconds(self.expires_in as i64);
            (expiry - Utc::now()).num_minutes().max(0)
        })
    }
}

/// Single owned home of the session state.
///
/// `SessionClient` is the only writer; views read through it.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<CredentialPair>>;
    fn set(&self, pair: &CredentialPair) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file store. Writes go to a sibling temp file which is then renamed
/// over the target, so readers see either the old pair or the new one.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read token file")?;
        let pair: CredentialPair = serde_json::from_str(&contents)
            .context("Failed to parse token file")?;
        Ok(Some(pair))
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(pair)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents).context("Failed to write token file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace token file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// In-process store, used by tests and by embedders that manage
/// persistence themselves.
#[derive(Default)]
pub struct MemoryTokenStore {
    pair: Mutex<Option<CredentialPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        let guard = self.pair.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let mut guard = self.pair.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.pair.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_pair_missing_fields_use_defaults() {
        let pair: CredentialPair = serde_json::from_str(r#"{"access_token":"A1"}"#).unwrap();
        assert_eq!(pair.access_token, "A1");
        assert_eq!(pair.refresh_token(), None);
        assert_eq!(pair.expires_in, DEFAULT_EXPIRES_IN_SECS);
        assert!(!pair.is_expired());
    }

    #[test]
    fn test_refreshed_keeps_refresh_token_unless_rotated() {
        let pair = CredentialPair::new("A1", Some("R1".into()), 120);

        let kept = pair.refreshed("A2".into(), 300, None);
        assert_eq!(kept.access_token, "A2");
        assert_eq!(kept.refresh_token(), Some("R1"));
        assert_eq!(kept.expires_in, 300);

        let rotated = pair.refreshed("A3".into(), 300, Some("R2".into()));
        assert_eq!(rotated.refresh_token(), Some("R2"));
    }

    #[test]
    fn test_empty_refresh_token_counts_as_missing() {
        let pair = CredentialPair::new("A1", Some(String::new()), 120);
        assert_eq!(pair.refresh_token(), None);
    }

    #[test]
    fn test_is_expired() {
        let mut pair = CredentialPair::new("A1", None, 60);
        assert!(!pair.is_expired());
        pair.issued_at = Some(Utc::now() - Duration::seconds(61));
        assert!(pair.is_expired());
        assert_eq!(pair.minutes_until_expiry(), Some(0));
    }

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        assert_eq!(store.get().unwrap(), None);

        let pair = CredentialPair::new("A1", Some("R1".into()), 120);
        store.set(&pair).unwrap();
        assert_eq!(store.get().unwrap(), Some(pair));
        assert!(!store.temp_path().exists());

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(&dir.path().join("nested").join("docportal"));
        store.set(&CredentialPair::new("A1", None, 120)).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(store.path(), "{\"refresh_token\":").unwrap();
        assert!(store.get().is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get().unwrap(), None);
        let pair = CredentialPair::new("A1", Some("R1".into()), 120);
        store.set(&pair).unwrap();
        assert_eq!(store.get().unwrap(), Some(pair));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
