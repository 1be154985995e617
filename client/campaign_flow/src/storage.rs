//! # Storage
//!
//! Session-scoped string key/value storage used as the staging log for
//! campaign drafts.
//!
//! | Key                | Value                                   |
//! |--------------------|-----------------------------------------|
//! | `campaignFormData` | JSON-encoded [`CampaignForm`]           |
//! | `selectedFile`     | `"true"` when a local image is staged   |
//! | `campaignFileData` | the image as a base64 `data:` URL       |
//! | `campaignFileName` | the image file name                     |
//!
//! A staged draft outlives the checkout page that reads it; only a confirmed
//! commit removes it.
//!
//! [`CampaignForm`]: crate::draft::CampaignForm

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::StorageError;

// ── Storage Keys ─────────────────────────────────────────────────────

pub const FORM_DATA_KEY: &str = "campaignFormData";
pub const HAS_FILE_KEY: &str = "selectedFile";
pub const FILE_DATA_KEY: &str = "campaignFileData";
pub const FILE_NAME_KEY: &str = "campaignFileName";

/// Every key belonging to a staged draft.
pub const DRAFT_KEYS: [&str; 4] = [FORM_DATA_KEY, HAS_FILE_KEY, FILE_DATA_KEY, FILE_NAME_KEY];

/// String key/value store scoped to one browser session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process [`SessionStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}
