//! Auto-increment ids kept in the `counters` collection.
//!
//! A counter record is `{ "key": "<collection>", "value": <last id> }`.

use serde_json::json;

use grocer_core::{ExpectedVersion, RecordId};

use super::r#trait::{Collection, RecordKey, RecordStore, StoreError, WriteBatch};

/// Reserve the next id of `collection`, adding the counter bump to `batch`.
///
/// The bump carries the counter's current revision, so two batches that
/// reserved the same id cannot both commit.
pub async fn allocate_id<S>(store: &S, collection: Collection, batch: &mut WriteBatch) -> Result<RecordId, StoreError>
where
    S: RecordStore + ?Sized,
{
    if !collection.is_auto_increment() {
        return Err(StoreError::InvalidRecord(format!(
            "{collection} is keyed by name, not by allocated id"
        )));
    }

    let key = RecordKey::Name(collection.name().to_string());
    let (revision, last) = match store.get(Collection::Counters, &key).await? {
        Some(record) => {
            let last = record.body.get("value").and_then(|v| v.as_u64()).ok_or_else(|| {
                StoreError::InvalidRecord(format!("counter '{collection}' has no integer value"))
            })?;
            (record.revision, last)
        }
        None => (0, 0),
    };

    let next = last + 1;
    batch.put(
        Collection::Counters,
        ExpectedVersion::Exact(revision),
        json!({ "key": collection.name(), "value": next }),
    );
    Ok(RecordId::new(next))
}
