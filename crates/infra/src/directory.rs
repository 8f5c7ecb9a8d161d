//! Customer and supplier directory.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use grocer_core::{Aggregate, ExpectedVersion};
use grocer_parties::{ContactInfo, Party, PartyCommand, PartyId, PartyKind, RegisterParty, UpdateDetails};

use crate::error::ServiceError;
use crate::records::{load_all, load_party, party_collection};
use crate::store::{RecordStore, WriteBatch, allocate_id};

/// Editable party fields. The balance only changes through postings and payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDetails {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone)]
pub struct DirectoryService<S> {
    store: S,
}

impl<S> DirectoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> DirectoryService<S>
where
    S: RecordStore,
{
    pub async fn list(&self, kind: PartyKind) -> Result<Vec<Party>, ServiceError> {
        load_all(&self.store, party_collection(kind)).await
    }

    pub async fn get(&self, kind: PartyKind, id: PartyId) -> Result<Party, ServiceError> {
        Ok(load_party(&self.store, kind, id).await?.value)
    }

    /// Register a customer or supplier with a zero balance.
    #[instrument(skip(self), err)]
    pub async fn register(&self, kind: PartyKind, details: PartyDetails) -> Result<Party, ServiceError> {
        let collection = party_collection(kind);
        let mut batch = WriteBatch::new();
        let id = PartyId::new(allocate_id(&self.store, collection, &mut batch).await?);

        let mut party = Party::empty(id, kind);
        party.execute(&PartyCommand::RegisterParty(RegisterParty {
            party_id: id,
            kind,
            name: details.name,
            contact: Some(details.contact),
            occurred_at: Utc::now(),
        }))?;

        batch.put_typed(collection, ExpectedVersion::Exact(0), &party)?;
        self.store.commit(batch).await?;

        info!(kind = %kind, party_id = %id, "party registered");
        Ok(party)
    }

    /// Replace name and contact; the balance is preserved.
    #[instrument(skip(self), err)]
    pub async fn update(&self, kind: PartyKind, id: PartyId, details: PartyDetails) -> Result<Party, ServiceError> {
        let mut loaded = load_party(&self.store, kind, id).await?;
        loaded.value.execute(&PartyCommand::UpdateDetails(UpdateDetails {
            party_id: id,
            name: Some(details.name),
            contact: Some(details.contact),
            occurred_at: Utc::now(),
        }))?;

        let mut batch = WriteBatch::new();
        batch.put_typed(
            party_collection(kind),
            ExpectedVersion::Exact(loaded.revision),
            &loaded.value,
        )?;
        self.store.commit(batch).await?;

        info!(kind = %kind, party_id = %id, "party updated");
        Ok(loaded.value)
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, kind: PartyKind, id: PartyId) -> Result<(), ServiceError> {
        let loaded = load_party(&self.store, kind, id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(party_collection(kind), id.0.into(), ExpectedVersion::Exact(loaded.revision));
        self.store.commit(batch).await?;

        info!(kind = %kind, party_id = %id, "party deleted");
        Ok(())
    }
}
