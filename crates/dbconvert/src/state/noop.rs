//! No-op error profile store.
//!
//! Used when the caller configures no profile file. Conversions complete but
//! failed tables cannot be looked up afterwards.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;

use super::backend::ErrorProfileStore;
use super::{ErrorProfile, ProfileKey};
use crate::error::Result;

/// Store that drops every profile. Warns once, on the first save.
#[derive(Debug, Default)]
pub struct NoopProfileStore {
    warned: AtomicBool,
}

impl NoopProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ErrorProfileStore for NoopProfileStore {
    async fn save(&self, profile: &ErrorProfile) -> Result<()> {
        if !self.warned.swap(true, Ordering::SeqCst) {
            warn!(
                table = %profile.key.source_table,
                "error profiles are not persisted: no profile store configured"
            );
        }
        Ok(())
    }

    async fn load(&self, _key: &ProfileKey) -> Result<Option<ErrorProfile>> {
        Ok(None)
    }

    async fn remove(&self, _key: &ProfileKey) -> Result<()> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ErrorProfile>> {
        Ok(Vec::new())
    }

    fn backend_type(&self) -> &'static str {
        "noop"
    }
}
