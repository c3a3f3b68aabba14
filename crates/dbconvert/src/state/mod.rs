//! Error profiles of failed table transfers.
//!
//! When a table's data transfer fails outside a transaction, the orchestrator
//! records an [`ErrorProfile`] so that the table can be found and redone
//! later. A clean transfer of the same table removes the profile again.

mod backend;
mod noop;

pub use backend::ErrorProfileStore;
pub use noop::NoopProfileStore;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::ServerInfo;
use crate::error::{ConvertError, Result};

/// Identity of a table transfer: both ends, server + database + table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileKey {
    pub source_server: String,
    pub source_database: String,
    pub source_table: String,
    pub target_server: String,
    pub target_database: String,
    pub target_table: String,
}

impl ProfileKey {
    pub fn new(source: &ServerInfo, source_table: &str, target: &ServerInfo, target_table: &str) -> Self {
        Self {
            source_server: source.server.clone(),
            source_database: source.database.clone(),
            source_table: source_table.to_string(),
            target_server: target.server.clone(),
            target_database: target.database.clone(),
            target_table: target_table.to_string(),
        }
    }
}

/// A failed table transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProfile {
    #[serde(flatten)]
    pub key: ProfileKey,

    /// Hash of the options the run used.
    pub options_hash: String,

    /// Rows written before the failure.
    pub rows_transferred: u64,

    pub error: String,

    pub failed_at: DateTime<Utc>,
}

impl ErrorProfile {
    pub fn new(key: ProfileKey, options_hash: impl Into<String>, rows_transferred: u64, error: impl Into<String>) -> Self {
        Self {
            key,
            options_hash: options_hash.into(),
            rows_transferred,
            error: error.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Profiles kept in one JSON document.
///
/// Writes go to a temp file first and are renamed over the document, so a
/// crash never leaves a truncated file behind.
#[derive(Debug)]
pub struct FileProfileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<ErrorProfile>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, profiles: &[ErrorProfile]) -> Result<()> {
        let content = serde_json::to_string_pretty(profiles)?;

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            ConvertError::State(format!("failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl ErrorProfileStore for FileProfileStore {
    async fn save(&self, profile: &ErrorProfile) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut profiles = self.read_all().await?;
        profiles.retain(|p| p.key != profile.key);
        profiles.push(profile.clone());
        self.write_all(&profiles).await?;
        debug!(table = %profile.key.source_table, path = %self.path.display(), "saved error profile");
        Ok(())
    }

    async fn load(&self, key: &ProfileKey) -> Result<Option<ErrorProfile>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_iter().find(|p| &p.key == key))
    }

    async fn remove(&self, key: &ProfileKey) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut profiles = self.read_all().await?;
        let before = profiles.len();
        profiles.retain(|p| &p.key != key);
        if profiles.len() != before {
            self.write_all(&profiles).await?;
            debug!(table = %key.source_table, "removed error profile");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ErrorProfile>> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DatabaseType;
    use tempfile::TempDir;

    fn key(table: &str) -> ProfileKey {
        ProfileKey::new(
            &ServerInfo::new(DatabaseType::SqlServer, "src", "shop"),
            table,
            &ServerInfo::new(DatabaseType::Postgres, "dst", "shop"),
            table,
        )
    }

    #[tokio::test]
    async fn test_file_store_save_load_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path().join("profiles.json"));

        assert!(store.load(&key("orders")).await.unwrap().is_none());

        store
            .save(&ErrorProfile::new(key("orders"), "abc", 10, "timeout"))
            .await
            .unwrap();
        store
            .save(&ErrorProfile::new(key("items"), "abc", 0, "deadlock"))
            .await
            .unwrap();
        store
            .save(&ErrorProfile::new(key("orders"), "abc", 20, "timeout again"))
            .await
            .unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        let orders = store.load(&key("orders")).await.unwrap().unwrap();
        assert_eq!(orders.rows_transferred, 20);
        assert!(!dir.path().join("profiles.tmp").exists());

        store.remove(&key("orders")).await.unwrap();
        store.remove(&key("missing")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_reopens_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.json");
        FileProfileStore::new(&path)
            .save(&ErrorProfile::new(key("orders"), "abc", 5, "boom"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"sourceTable\": \"orders\""));
        assert!(content.contains("\"optionsHash\": \"abc\""));

        let reopened = FileProfileStore::new(&path);
        assert_eq!(reopened.list().await.unwrap()[0].error, "boom");
    }

    #[tokio::test]
    async fn test_noop_store() {
        let store = NoopProfileStore::new();
        store
            .save(&ErrorProfile::new(key("orders"), "abc", 0, "boom"))
            .await
            .unwrap();
        assert!(store.load(&key("orders")).await.unwrap().is_none());
        assert_eq!(store.backend_type(), "noop");
    }
}
