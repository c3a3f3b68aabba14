//! Error profile store trait.
//!
//! The orchestrator works with `Arc<dyn ErrorProfileStore>` without knowing
//! where profiles live:
//!
//! - **File**: JSON document on disk, [`super::FileProfileStore`]
//! - **No-op**: nothing is persisted, [`super::NoopProfileStore`]

use async_trait::async_trait;

use super::{ErrorProfile, ProfileKey};
use crate::error::Result;

/// Persistence of failed table transfers.
///
/// # Example
///
/// ```rust,ignore
/// let store: Arc<dyn ErrorProfileStore> = Arc::new(FileProfileStore::new("profiles.json"));
/// store.save(&profile).await?;
/// let pending = store.load(&profile.key).await?;
/// ```
#[async_trait]
pub trait ErrorProfileStore: Send + Sync {
    /// Save a profile, replacing one with the same key.
    async fn save(&self, profile: &ErrorProfile) -> Result<()>;

    /// Load the profile recorded for a key.
    async fn load(&self, key: &ProfileKey) -> Result<Option<ErrorProfile>>;

    /// Remove the profile for a key. Removing a missing profile is not an error.
    async fn remove(&self, key: &ProfileKey) -> Result<()>;

    /// All stored profiles.
    async fn list(&self) -> Result<Vec<ErrorProfile>>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}
