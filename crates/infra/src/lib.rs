//! Infrastructure layer: record store, postings, services, config.

pub mod backup;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod records;
pub mod reports;
pub mod settings;
pub mod store;

pub use backup::BackupService;
pub use catalog::{CatalogService, ProductDetails};
pub use config::{AppConfig, StoreBackend};
pub use directory::{DirectoryService, PartyDetails};
pub use error::ServiceError;
pub use ledger::LedgerPoster;
pub use reports::{DateRange, ReportService};
pub use settings::{Setting, SettingsService};
pub use store::{Collection, InMemoryStore, RecordStore, SqliteStore, StoreError};
