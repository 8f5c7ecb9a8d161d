//! Typed loading of stored records.

use serde::de::DeserializeOwned;

use grocer_core::DomainError;
use grocer_parties::{Party, PartyId, PartyKind};
use grocer_products::{Product, ProductId};

use crate::error::ServiceError;
use crate::store::{Collection, RecordKey, RecordStore};

/// A decoded record with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub revision: u64,
}

pub async fn load<S, T>(store: &S, collection: Collection, key: RecordKey) -> Result<Option<Loaded<T>>, ServiceError>
where
    S: RecordStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(collection, &key).await? {
        Some(record) => Ok(Some(Loaded {
            value: record.decode()?,
            revision: record.revision,
        })),
        None => Ok(None),
    }
}

pub async fn load_all<S, T>(store: &S, collection: Collection) -> Result<Vec<T>, ServiceError>
where
    S: RecordStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .list(collection)
        .await?
        .iter()
        .map(|record| record.decode().map_err(ServiceError::from))
        .collect()
}

pub fn party_collection(kind: PartyKind) -> Collection {
    match kind {
        PartyKind::Customer => Collection::Customers,
        PartyKind::Supplier => Collection::Suppliers,
    }
}

pub async fn load_product<S>(store: &S, id: ProductId) -> Result<Loaded<Product>, ServiceError>
where
    S: RecordStore + ?Sized,
{
    load(store, Collection::Products, id.0.into())
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
}

pub async fn load_party<S>(store: &S, kind: PartyKind, id: PartyId) -> Result<Loaded<Party>, ServiceError>
where
    S: RecordStore + ?Sized,
{
    let loaded: Loaded<Party> = load(store, party_collection(kind), id.0.into())
        .await?
        .ok_or_else(|| ServiceError::from(DomainError::not_found(format!("{kind} {id}"))))?;

    if loaded.value.kind() != kind {
        return Err(DomainError::invariant(format!(
            "{kind} {id} is stored as a {}",
            loaded.value.kind()
        ))
        .into());
    }
    Ok(loaded)
}
