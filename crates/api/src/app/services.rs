use std::sync::Arc;

use anyhow::Context;

use grocer_infra::{
    AppConfig, BackupService, CatalogService, DirectoryService, InMemoryStore, LedgerPoster, RecordStore,
    ReportService, SettingsService, SqliteStore, StoreBackend,
};
use grocer_inventory::UnderflowPolicy;

/// Store handle shared by every service.
pub type SharedStore = Arc<dyn RecordStore>;

#[derive(Clone)]
pub struct AppServices {
    pub poster: LedgerPoster<SharedStore>,
    pub catalog: CatalogService<SharedStore>,
    pub directory: DirectoryService<SharedStore>,
    pub settings: SettingsService<SharedStore>,
    pub reports: ReportService<SharedStore>,
    pub backup: BackupService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, policy: UnderflowPolicy) -> Self {
        Self {
            poster: LedgerPoster::new(store.clone(), policy),
            catalog: CatalogService::new(store.clone()),
            directory: DirectoryService::new(store.clone()),
            settings: SettingsService::new(store.clone()),
            reports: ReportService::new(store.clone()),
            backup: BackupService::new(store),
        }
    }

    /// Services over a fresh volatile store (tests, demos).
    pub fn in_memory(policy: UnderflowPolicy) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), policy)
    }
}

/// Open the configured store and wire the services on top of it.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match &config.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Sqlite(url) => Arc::new(
            SqliteStore::connect(url)
                .await
                .with_context(|| format!("failed to open sqlite store at {url}"))?,
        ),
    };
    Ok(AppServices::new(store, config.stock_underflow))
}
