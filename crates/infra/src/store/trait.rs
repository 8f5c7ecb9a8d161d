use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use grocer_core::ExpectedVersion;

/// The fixed set of persisted collections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Sales,
    Purchases,
    Suppliers,
    Customers,
    Users,
    Settings,
    Counters,
}

impl Collection {
    /// Every collection, in backup order.
    pub const ALL: [Collection; 8] = [
        Collection::Products,
        Collection::Sales,
        Collection::Purchases,
        Collection::Suppliers,
        Collection::Customers,
        Collection::Users,
        Collection::Settings,
        Collection::Counters,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Sales => "sales",
            Collection::Purchases => "purchases",
            Collection::Suppliers => "suppliers",
            Collection::Customers => "customers",
            Collection::Users => "users",
            Collection::Settings => "settings",
            Collection::Counters => "counters",
        }
    }

    pub fn from_name(name: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Field of the record body that holds its key.
    pub fn key_field(&self) -> &'static str {
        if self.is_auto_increment() { "id" } else { "key" }
    }

    /// Keyed by integer ids allocated from `counters`.
    pub fn is_auto_increment(&self) -> bool {
        !matches!(self, Collection::Settings | Collection::Counters)
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Primary key of a record within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Id(u64),
    Name(String),
}

impl RecordKey {
    /// Extract the key from a record body, checking it has the shape the
    /// collection expects (positive integer `id` or non-empty string `key`).
    pub fn from_body(collection: Collection, body: &JsonValue) -> Result<RecordKey, StoreError> {
        let field = collection.key_field();
        let raw = body.get(field).ok_or_else(|| {
            StoreError::InvalidRecord(format!("{collection} record is missing its '{field}' field"))
        })?;

        if collection.is_auto_increment() {
            match raw.as_u64() {
                Some(id) if id > 0 => Ok(RecordKey::Id(id)),
                _ => Err(StoreError::InvalidRecord(format!(
                    "{collection} record has a non-positive-integer '{field}': {raw}"
                ))),
            }
        } else {
            match raw.as_str() {
                Some(name) if !name.is_empty() => Ok(RecordKey::Name(name.to_string())),
                _ => Err(StoreError::InvalidRecord(format!(
                    "{collection} record has a non-string '{field}': {raw}"
                ))),
            }
        }
    }

    /// Parse the textual form used by persistent backends.
    pub fn parse(collection: Collection, raw: &str) -> Result<RecordKey, StoreError> {
        if collection.is_auto_increment() {
            raw.parse::<u64>()
                .map(RecordKey::Id)
                .map_err(|e| StoreError::InvalidRecord(format!("{collection} key '{raw}': {e}")))
        } else {
            Ok(RecordKey::Name(raw.to_string()))
        }
    }
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{id}"),
            RecordKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<grocer_core::RecordId> for RecordKey {
    fn from(id: grocer_core::RecordId) -> Self {
        RecordKey::Id(id.get())
    }
}

/// A record as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: RecordKey,
    /// Bumped on every write; `0` is never stored (it means "absent").
    pub revision: u64,
    pub body: JsonValue,
}

impl StoredRecord {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| StoreError::Serialization(format!("record {}: {e}", self.key)))
    }
}

/// One operation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace; the key is taken from the body.
    Put {
        collection: Collection,
        expected: ExpectedVersion,
        body: JsonValue,
    },
    Delete {
        collection: Collection,
        key: RecordKey,
        expected: ExpectedVersion,
    },
    Clear { collection: Collection },
}

/// Ordered group of writes applied in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, collection: Collection, expected: ExpectedVersion, body: JsonValue) -> &mut Self {
        self.ops.push(WriteOp::Put {
            collection,
            expected,
            body,
        });
        self
    }

    pub fn put_typed<T: Serialize>(
        &mut self,
        collection: Collection,
        expected: ExpectedVersion,
        value: &T,
    ) -> Result<&mut Self, StoreError> {
        let body = serde_json::to_value(value)
            .map_err(|e| StoreError::Serialization(format!("{collection} record: {e}")))?;
        Ok(self.put(collection, expected, body))
    }

    pub fn delete(&mut self, collection: Collection, key: RecordKey, expected: ExpectedVersion) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection,
            key,
            expected,
        });
        self
    }

    pub fn clear(&mut self, collection: Collection) -> &mut Self {
        self.ops.push(WriteOp::Clear { collection });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Record store operation error.
///
/// Infrastructure errors (storage, concurrency) as opposed to domain errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn revision_mismatch(
        collection: Collection,
        key: &RecordKey,
        expected: ExpectedVersion,
        actual: u64,
    ) -> Self {
        StoreError::Conflict(format!(
            "{collection}/{key}: expected {expected:?}, found revision {actual}"
        ))
    }
}

/// Collection-oriented record store.
///
/// Implementations must:
/// - apply a batch atomically (every op or none)
/// - check each op's `ExpectedVersion` against the revision as seen by the
///   ops before it in the same batch
/// - return records of a collection in key order from `list`
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: Collection, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError>;

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn get(&self, collection: Collection, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        (**self).get(collection, key).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError> {
        (**self).list(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collections_round_trip_by_name() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_name(c.name()), Some(c));
        }
        assert_eq!(Collection::from_name("invoices"), None);
    }

    #[test]
    fn key_field_depends_on_collection() {
        assert_eq!(Collection::Products.key_field(), "id");
        assert_eq!(Collection::Users.key_field(), "id");
        assert_eq!(Collection::Settings.key_field(), "key");
        assert_eq!(Collection::Counters.key_field(), "key");
    }

    #[test]
    fn extracts_keys_from_bodies() {
        let key = RecordKey::from_body(Collection::Sales, &json!({ "id": 12 })).unwrap();
        assert_eq!(key, RecordKey::Id(12));

        let key = RecordKey::from_body(Collection::Settings, &json!({ "key": "shop_name", "value": "x" })).unwrap();
        assert_eq!(key, RecordKey::Name("shop_name".to_string()));
    }

    #[test]
    fn rejects_missing_or_malformed_keys() {
        for (collection, body) in [
            (Collection::Products, json!({ "name": "no id" })),
            (Collection::Products, json!({ "id": 0 })),
            (Collection::Products, json!({ "id": "7" })),
            (Collection::Settings, json!({ "key": 3 })),
            (Collection::Counters, json!({ "key": "" })),
        ] {
            let err = RecordKey::from_body(collection, &body).unwrap_err();
            assert!(matches!(err, StoreError::InvalidRecord(_)), "{collection}: {body}");
        }
    }

    #[test]
    fn id_keys_sort_numerically() {
        let mut keys = vec![RecordKey::Id(10), RecordKey::Id(2), RecordKey::Id(1)];
        keys.sort();
        assert_eq!(keys, vec![RecordKey::Id(1), RecordKey::Id(2), RecordKey::Id(10)]);
    }
}
