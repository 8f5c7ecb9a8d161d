//! Ledger poster: applies sales, purchases and payments to the store.
//!
//! Each posting follows the same pipeline:
//!
//! ```text
//! Draft
//!   ↓
//! 1. Validate the draft (pure)
//!   ↓
//! 2. Load every touched record with its revision
//!   ↓
//! 3. Execute commands on the aggregates (stock, average cost, balances)
//!   ↓
//! 4. Allocate the new record id from `counters`
//!   ↓
//! 5. Commit one batch: new record + updated snapshots, each revision-checked
//! ```
//!
//! Nothing is written unless step 5 succeeds as a whole. There is no retry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use grocer_core::{Aggregate, DomainError, Event, ExpectedVersion, Money};
use grocer_inventory::UnderflowPolicy;
use grocer_parties::{ChargeBalance, Party, PartyCommand, PartyId, PartyKind, SettleBalance};
use grocer_products::{IssueStock, Product, ProductCommand, ProductEvent, ProductId, ReceiveStock};
use grocer_purchasing::{Purchase, PurchaseDraft, PurchaseId, PurchaseLine};
use grocer_sales::{Sale, SaleDraft, SaleId, SaleLine};

use crate::error::ServiceError;
use crate::records::{Loaded, load, load_all, load_party, load_product, party_collection};
use crate::store::{Collection, RecordStore, WriteBatch, allocate_id};

/// Products touched by one posting, kept in first-touch order so repeated
/// lines for the same product apply sequentially to one snapshot.
#[derive(Default)]
struct TouchedProducts {
    order: Vec<ProductId>,
    products: HashMap<ProductId, Loaded<Product>>,
}

impl TouchedProducts {
    async fn get_mut<S>(&mut self, store: &S, id: ProductId) -> Result<&mut Product, ServiceError>
    where
        S: RecordStore + ?Sized,
    {
        if !self.products.contains_key(&id) {
            let loaded = load_product(store, id).await?;
            self.order.push(id);
            self.products.insert(id, loaded);
        }
        self.products
            .get_mut(&id)
            .map(|loaded| &mut loaded.value)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
    }

    fn stage(&self, batch: &mut WriteBatch) -> Result<(), ServiceError> {
        for id in &self.order {
            if let Some(loaded) = self.products.get(id) {
                batch.put_typed(
                    Collection::Products,
                    ExpectedVersion::Exact(loaded.revision),
                    &loaded.value,
                )?;
            }
        }
        Ok(())
    }
}

fn log_events<E: Event>(events: &[E]) {
    for event in events {
        debug!(event_type = event.event_type(), occurred_at = %event.occurred_at(), "applied");
    }
}

/// Posts sales, purchases and payments against a [`RecordStore`].
#[derive(Debug, Clone)]
pub struct LedgerPoster<S> {
    store: S,
    policy: UnderflowPolicy,
}

impl<S> LedgerPoster<S> {
    pub fn new(store: S, policy: UnderflowPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> UnderflowPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> LedgerPoster<S>
where
    S: RecordStore,
{
    /// Post a sale: decrement stock per line, charge the customer if the sale
    /// is deferred, and write the sale record.
    ///
    /// Line prices default to the product's sale price; each line captures
    /// the product's average cost at the moment of sale.
    #[instrument(
        skip(self, draft),
        fields(lines = draft.lines.len(), payment = ?draft.payment_method, policy = ?self.policy),
        err
    )]
    pub async fn post_sale(&self, draft: SaleDraft) -> Result<Sale, ServiceError> {
        draft.validate()?;

        let mut touched = TouchedProducts::default();
        let mut lines = Vec::with_capacity(draft.lines.len());

        for line in &draft.lines {
            let product = touched.get_mut(&self.store, line.product_id).await?;
            let unit_price = line.unit_price.unwrap_or_else(|| product.sale_price());
            let unit_cost = product.avg_cost();

            let events = product.execute(&ProductCommand::IssueStock(IssueStock {
                product_id: line.product_id,
                quantity: line.quantity,
                policy: self.policy,
                occurred_at: draft.occurred_at,
            }))?;
            log_events(&events);

            for event in &events {
                if let ProductEvent::StockIssued(issued) = event {
                    if issued.shortfall > 0 {
                        warn!(
                            product_id = %issued.product_id,
                            requested = issued.requested,
                            issued = issued.issued,
                            shortfall = issued.shortfall,
                            "stock clamped at zero"
                        );
                    }
                }
            }

            lines.push(SaleLine {
                product_id: line.product_id,
                name: product.name().to_string(),
                quantity: line.quantity,
                unit_price,
                unit_cost,
            });
        }

        let customer = match draft.customer_id {
            Some(id) => Some(load_party(&self.store, PartyKind::Customer, id).await?),
            None => None,
        };

        let mut batch = WriteBatch::new();
        let sale_id = SaleId::new(allocate_id(&self.store, Collection::Sales, &mut batch).await?);
        let sale = Sale::from_draft(sale_id, &draft, lines)?;

        batch.put_typed(Collection::Sales, ExpectedVersion::Exact(0), &sale)?;
        touched.stage(&mut batch)?;

        if let Some(mut customer) = customer {
            if sale.is_deferred() {
                let events = customer.value.execute(&PartyCommand::ChargeBalance(ChargeBalance {
                    party_id: customer.value.id_typed(),
                    amount: sale.total(),
                    reference: format!("sale {sale_id}"),
                    occurred_at: draft.occurred_at,
                }))?;
                log_events(&events);
                batch.put_typed(
                    Collection::Customers,
                    ExpectedVersion::Exact(customer.revision),
                    &customer.value,
                )?;
            }
        }

        self.store.commit(batch).await?;

        info!(
            sale_id = %sale_id,
            total = %sale.total(),
            deferred = sale.is_deferred(),
            "sale posted"
        );
        Ok(sale)
    }

    /// Post a purchase: receive stock per line (recomputing average cost),
    /// add the total to the supplier's balance, and write the purchase record.
    #[instrument(
        skip(self, draft),
        fields(lines = draft.lines.len(), supplier_id = %draft.supplier_id),
        err
    )]
    pub async fn post_purchase(&self, draft: PurchaseDraft) -> Result<Purchase, ServiceError> {
        draft.validate()?;

        let mut supplier = load_party(&self.store, PartyKind::Supplier, draft.supplier_id).await?;

        let mut touched = TouchedProducts::default();
        let mut lines = Vec::with_capacity(draft.lines.len());

        for line in &draft.lines {
            let product = touched.get_mut(&self.store, line.product_id).await?;
            let events = product.execute(&ProductCommand::ReceiveStock(ReceiveStock {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_cost: line.unit_cost,
                occurred_at: draft.occurred_at,
            }))?;
            log_events(&events);

            lines.push(PurchaseLine {
                product_id: line.product_id,
                name: product.name().to_string(),
                quantity: line.quantity,
                unit_cost: line.unit_cost,
            });
        }

        let mut batch = WriteBatch::new();
        let purchase_id = PurchaseId::new(allocate_id(&self.store, Collection::Purchases, &mut batch).await?);
        let purchase = Purchase::from_draft(purchase_id, &draft, lines)?;

        let events = supplier.value.execute(&PartyCommand::ChargeBalance(ChargeBalance {
            party_id: draft.supplier_id,
            amount: purchase.total(),
            reference: format!("purchase {purchase_id}"),
            occurred_at: draft.occurred_at,
        }))?;
        log_events(&events);

        batch.put_typed(Collection::Purchases, ExpectedVersion::Exact(0), &purchase)?;
        touched.stage(&mut batch)?;
        batch.put_typed(
            Collection::Suppliers,
            ExpectedVersion::Exact(supplier.revision),
            &supplier.value,
        )?;

        self.store.commit(batch).await?;

        info!(purchase_id = %purchase_id, total = %purchase.total(), "purchase posted");
        Ok(purchase)
    }

    pub async fn list_sales(&self) -> Result<Vec<Sale>, ServiceError> {
        load_all(&self.store, Collection::Sales).await
    }

    pub async fn get_sale(&self, id: SaleId) -> Result<Sale, ServiceError> {
        load(&self.store, Collection::Sales, id.0.into())
            .await?
            .map(|loaded| loaded.value)
            .ok_or_else(|| DomainError::not_found(format!("sale {id}")).into())
    }

    pub async fn list_purchases(&self) -> Result<Vec<Purchase>, ServiceError> {
        load_all(&self.store, Collection::Purchases).await
    }

    pub async fn get_purchase(&self, id: PurchaseId) -> Result<Purchase, ServiceError> {
        load(&self.store, Collection::Purchases, id.0.into())
            .await?
            .map(|loaded| loaded.value)
            .ok_or_else(|| DomainError::not_found(format!("purchase {id}")).into())
    }

    /// Record money received from a customer. The balance may go negative.
    #[instrument(skip(self, occurred_at), err)]
    pub async fn record_customer_payment(
        &self,
        customer_id: PartyId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Result<Party, ServiceError> {
        self.record_payment(PartyKind::Customer, customer_id, amount, occurred_at).await
    }

    /// Record money paid to a supplier. The balance may go negative.
    #[instrument(skip(self, occurred_at), err)]
    pub async fn record_supplier_payment(
        &self,
        supplier_id: PartyId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Result<Party, ServiceError> {
        self.record_payment(PartyKind::Supplier, supplier_id, amount, occurred_at).await
    }

    async fn record_payment(
        &self,
        kind: PartyKind,
        id: PartyId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Result<Party, ServiceError> {
        let mut party = load_party(&self.store, kind, id).await?;

        let events = party.value.execute(&PartyCommand::SettleBalance(SettleBalance {
            party_id: id,
            amount,
            occurred_at,
        }))?;
        log_events(&events);

        let mut batch = WriteBatch::new();
        batch.put_typed(
            party_collection(kind),
            ExpectedVersion::Exact(party.revision),
            &party.value,
        )?;
        self.store.commit(batch).await?;

        info!(kind = %kind, party_id = %id, balance = %party.value.balance(), "payment recorded");
        Ok(party.value)
    }
}
