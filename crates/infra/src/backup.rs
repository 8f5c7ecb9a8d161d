//! Whole-store backup as one JSON document keyed by collection name.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value as JsonValue, json};
use tracing::{info, instrument, warn};

use grocer_core::{DomainError, ExpectedVersion};

use crate::error::ServiceError;
use crate::store::{Collection, RecordKey, RecordStore, WriteBatch};

#[derive(Debug, Clone)]
pub struct BackupService<S> {
    store: S,
}

impl<S> BackupService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> BackupService<S>
where
    S: RecordStore,
{
    /// `{ "<collection>": [record, ...], ... }` for every collection.
    #[instrument(skip(self), err)]
    pub async fn export(&self) -> Result<JsonValue, ServiceError> {
        let mut doc = Map::new();
        let mut total = 0;
        for collection in Collection::ALL {
            let records: Vec<JsonValue> = self
                .store
                .list(collection)
                .await?
                .into_iter()
                .map(|record| record.body)
                .collect();
            total += records.len();
            doc.insert(collection.name().to_string(), JsonValue::Array(records));
        }

        info!(records = total, "backup exported");
        Ok(JsonValue::Object(doc))
    }

    /// Replace the whole store with the contents of `doc`.
    ///
    /// Every record is checked before anything is written. Collections
    /// missing from `doc` end up empty and unknown names are skipped.
    /// Product barcodes must be unique across the imported products.
    /// Counters are raised to at least the highest imported id so later
    /// inserts never reuse one.
    #[instrument(skip(self, doc), err)]
    pub async fn import(&self, doc: JsonValue) -> Result<(), ServiceError> {
        let JsonValue::Object(doc) = doc else {
            return Err(DomainError::validation("backup must be a JSON object keyed by collection").into());
        };

        let mut records: Vec<(Collection, JsonValue)> = Vec::new();
        let mut counters: BTreeMap<String, u64> = BTreeMap::new();
        let mut barcodes: HashMap<String, u64> = HashMap::new();

        for (name, value) in doc {
            let Some(collection) = Collection::from_name(&name) else {
                warn!(collection = %name, "skipping unknown collection in backup");
                continue;
            };
            let JsonValue::Array(items) = value else {
                return Err(DomainError::validation(format!("backup collection '{name}' must be an array")).into());
            };

            for (index, body) in items.into_iter().enumerate() {
                let key = RecordKey::from_body(collection, &body).map_err(|err| {
                    DomainError::validation(format!("{name}[{index}]: {err}"))
                })?;

                match (collection, key) {
                    (Collection::Counters, RecordKey::Name(counter)) => {
                        let value = body.get("value").and_then(JsonValue::as_u64).ok_or_else(|| {
                            DomainError::validation(format!("{name}[{index}]: counter has no integer value"))
                        })?;
                        raise(&mut counters, counter, value);
                    }
                    (_, RecordKey::Id(id)) => {
                        if collection == Collection::Products {
                            claim_barcode(&mut barcodes, &body, id)
                                .map_err(|msg| DomainError::validation(format!("{name}[{index}]: {msg}")))?;
                        }
                        raise(&mut counters, collection.name().to_string(), id);
                        records.push((collection, body));
                    }
                    (_, RecordKey::Name(_)) => records.push((collection, body)),
                }
            }
        }

        let mut batch = WriteBatch::new();
        for collection in Collection::ALL {
            batch.clear(collection);
        }
        let imported = records.len();
        for (collection, body) in records {
            batch.put(collection, ExpectedVersion::Any, body);
        }
        for (counter, value) in counters {
            batch.put(
                Collection::Counters,
                ExpectedVersion::Any,
                json!({ "key": counter, "value": value }),
            );
        }
        self.store.commit(batch).await?;

        info!(records = imported, "backup imported");
        Ok(())
    }
}

fn claim_barcode(barcodes: &mut HashMap<String, u64>, body: &JsonValue, id: u64) -> Result<(), String> {
    let Some(barcode) = body.get("barcode").and_then(JsonValue::as_str).map(str::trim) else {
        return Ok(());
    };
    if barcode.is_empty() {
        return Ok(());
    }
    match barcodes.insert(barcode.to_string(), id) {
        Some(existing) => Err(format!("barcode '{barcode}' is already used by product {existing}")),
        None => Ok(()),
    }
}

fn raise(counters: &mut BTreeMap<String, u64>, key: String, value: u64) {
    let entry = counters.entry(key).or_insert(0);
    *entry = (*entry).max(value);
}
