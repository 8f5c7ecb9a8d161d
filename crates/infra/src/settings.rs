//! Store settings: string key/value pairs in the `settings` collection.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use grocer_core::{DomainError, ExpectedVersion};

use crate::error::ServiceError;
use crate::records::{load, load_all};
use crate::store::{Collection, RecordKey, RecordStore, WriteBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct SettingsService<S> {
    store: S,
}

impl<S> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> SettingsService<S>
where
    S: RecordStore,
{
    /// Every setting, ordered by key.
    pub async fn all(&self) -> Result<Vec<Setting>, ServiceError> {
        load_all(&self.store, Collection::Settings).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<Setting>, ServiceError> {
        Ok(load(&self.store, Collection::Settings, RecordKey::Name(key.to_string()))
            .await?
            .map(|loaded| loaded.value))
    }

    /// Write every setting in one batch (last write wins per key).
    #[instrument(skip(self, settings), fields(count = settings.len()), err)]
    pub async fn save(&self, settings: Vec<Setting>) -> Result<(), ServiceError> {
        let mut batch = WriteBatch::new();
        for setting in &settings {
            if setting.key.trim().is_empty() {
                return Err(DomainError::validation("setting key cannot be empty").into());
            }
            batch.put_typed(Collection::Settings, ExpectedVersion::Any, setting)?;
        }
        self.store.commit(batch).await?;

        info!(count = settings.len(), "settings saved");
        Ok(())
    }
}
