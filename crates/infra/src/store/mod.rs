//! Local record store boundary.
//!
//! The store holds a fixed set of named collections of JSON records. Writes
//! are grouped into a [`WriteBatch`] and applied all-or-nothing, with an
//! optimistic revision check per record.

pub mod counters;
pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use counters::allocate_id;
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use r#trait::{
    Collection, RecordKey, RecordStore, StoreError, StoredRecord, WriteBatch, WriteOp,
};
