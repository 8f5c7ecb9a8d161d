use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::r#trait::{Collection, RecordKey, RecordStore, StoreError, StoredRecord, WriteBatch, WriteOp};

type Records = BTreeMap<RecordKey, (u64, JsonValue)>;

/// In-memory record store.
///
/// Intended for tests/dev. A batch is applied to a copy of the touched
/// collections and swapped in only if every op succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Records>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(staged: &mut HashMap<Collection, Records>, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Put {
            collection,
            expected,
            body,
        } => {
            let key = RecordKey::from_body(collection, &body)?;
            let records = staged.entry(collection).or_default();
            let current = records.get(&key).map(|(rev, _)| *rev).unwrap_or(0);
            if !expected.matches(current) {
                return Err(StoreError::revision_mismatch(collection, &key, expected, current));
            }
            records.insert(key, (current + 1, body));
        }
        WriteOp::Delete {
            collection,
            key,
            expected,
        } => {
            let records = staged.entry(collection).or_default();
            let current = records.get(&key).map(|(rev, _)| *rev).unwrap_or(0);
            if !expected.matches(current) {
                return Err(StoreError::revision_mismatch(collection, &key, expected, current));
            }
            records.remove(&key);
        }
        WriteOp::Clear { collection } => {
            staged.insert(collection, Records::new());
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, collection: Collection, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(collections
            .get(&collection)
            .and_then(|records| records.get(key))
            .map(|(revision, body)| StoredRecord {
                key: key.clone(),
                revision: *revision,
                body: body.clone(),
            }))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(key, (revision, body))| StoredRecord {
                        key: key.clone(),
                        revision: *revision,
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // Stage only the collections this batch touches.
        let mut staged: HashMap<Collection, Records> = HashMap::new();
        for op in batch.ops() {
            let collection = match op {
                WriteOp::Put { collection, .. }
                | WriteOp::Delete { collection, .. }
                | WriteOp::Clear { collection } => *collection,
            };
            staged
                .entry(collection)
                .or_insert_with(|| collections.get(&collection).cloned().unwrap_or_default());
        }

        for op in batch.into_ops() {
            apply(&mut staged, op)?;
        }

        collections.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocer_core::ExpectedVersion;
    use serde_json::json;

    #[tokio::test]
    async fn put_assigns_revisions() {
        let store = InMemoryStore::new();

        let mut batch = WriteBatch::new();
        batch.put(Collection::Products, ExpectedVersion::Exact(0), json!({ "id": 1, "name": "Tea" }));
        store.commit(batch).await.unwrap();

        let record = store.get(Collection::Products, &RecordKey::Id(1)).await.unwrap().unwrap();
        assert_eq!(record.revision, 1);
        assert_eq!(record.body["name"], "Tea");

        let mut batch = WriteBatch::new();
        batch.put(Collection::Products, ExpectedVersion::Exact(1), json!({ "id": 1, "name": "Green tea" }));
        store.commit(batch).await.unwrap();

        let record = store.get(Collection::Products, &RecordKey::Id(1)).await.unwrap().unwrap();
        assert_eq!(record.revision, 2);
    }

    #[tokio::test]
    async fn stale_revision_aborts_whole_batch() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Collection::Products, ExpectedVersion::Exact(0), json!({ "id": 1 }));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put(Collection::Customers, ExpectedVersion::Exact(0), json!({ "id": 1 }))
            .put(Collection::Products, ExpectedVersion::Exact(0), json!({ "id": 1 }));
        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert!(store.list(Collection::Customers).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ops_see_earlier_ops_in_the_same_batch() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .put(Collection::Settings, ExpectedVersion::Exact(0), json!({ "key": "a", "value": "1" }))
            .put(Collection::Settings, ExpectedVersion::Exact(1), json!({ "key": "a", "value": "2" }));
        store.commit(batch).await.unwrap();

        let record = store
            .get(Collection::Settings, &RecordKey::Name("a".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.revision, 2);
        assert_eq!(record.body["value"], "2");
    }

    #[tokio::test]
    async fn clear_then_put_restarts_revisions() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .put(Collection::Users, ExpectedVersion::Any, json!({ "id": 1 }))
            .put(Collection::Users, ExpectedVersion::Any, json!({ "id": 2 }));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .clear(Collection::Users)
            .put(Collection::Users, ExpectedVersion::Exact(0), json!({ "id": 2, "name": "owner" }));
        store.commit(batch).await.unwrap();

        let users = store.list(Collection::Users).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].revision, 1);
        assert_eq!(users[0].body["name"], "owner");
    }

    #[tokio::test]
    async fn delete_checks_revision() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Collection::Suppliers, ExpectedVersion::Any, json!({ "id": 4 }));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete(Collection::Suppliers, RecordKey::Id(4), ExpectedVersion::Exact(3));
        assert!(matches!(store.commit(batch).await, Err(StoreError::Conflict(_))));

        let mut batch = WriteBatch::new();
        batch.delete(Collection::Suppliers, RecordKey::Id(4), ExpectedVersion::Exact(1));
        store.commit(batch).await.unwrap();
        assert!(store.get(Collection::Suppliers, &RecordKey::Id(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_in_key_order() {
        let store = InMemoryStore::new();
        let mut batch = WriteBatch::new();
        for id in [10, 2, 7] {
            batch.put(Collection::Sales, ExpectedVersion::Any, json!({ "id": id }));
        }
        store.commit(batch).await.unwrap();

        let keys: Vec<RecordKey> = store
            .list(Collection::Sales)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec![RecordKey::Id(2), RecordKey::Id(7), RecordKey::Id(10)]);
    }
}
