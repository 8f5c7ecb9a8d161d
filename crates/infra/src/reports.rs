//! Read-only reports computed from the stored collections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use grocer_core::{DomainError, Money};
use grocer_parties::{Party, PartyId, PartyKind};
use grocer_products::{Product, ProductId};
use grocer_sales::{PaymentMethod, Sale, SaleId};

use crate::error::ServiceError;
use crate::records::{load_all, party_collection};
use crate::store::{Collection, RecordStore};

/// Inclusive calendar-day range (UTC). Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, DomainError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(DomainError::validation(format!(
                    "date range start {from} is after its end {to}"
                )));
            }
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReportRow {
    pub sale_id: SaleId,
    pub occurred_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub items: usize,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub range: DateRange,
    pub rows: Vec<SalesReportRow>,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryValueRow {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub avg_cost: Money,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryValueReport {
    pub rows: Vec<InventoryValueRow>,
    pub total_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub party_id: PartyId,
    pub name: String,
    pub phone: Option<String>,
    pub balance: Money,
}

/// Parties with a positive balance (customers who owe, suppliers owed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesReport {
    pub kind: PartyKind,
    pub rows: Vec<BalanceRow>,
    pub total: Money,
}

#[derive(Debug, Clone)]
pub struct ReportService<S> {
    store: S,
}

impl<S> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> ReportService<S>
where
    S: RecordStore,
{
    /// Revenue is the sale total (after discount); cost is Σ unit cost × qty.
    pub async fn sales(&self, range: DateRange) -> Result<SalesReport, ServiceError> {
        let sales: Vec<Sale> = load_all(&self.store, Collection::Sales).await?;

        let rows: Vec<SalesReportRow> = sales
            .iter()
            .filter(|sale| range.contains(sale.occurred_at()))
            .map(|sale| SalesReportRow {
                sale_id: sale.id_typed(),
                occurred_at: sale.occurred_at(),
                payment_method: sale.payment_method(),
                items: sale.lines().len(),
                revenue: sale.total(),
                cost: sale.cost(),
                profit: sale.profit(),
            })
            .collect();

        let total_revenue: Money = rows.iter().map(|r| r.revenue).sum();
        let total_cost: Money = rows.iter().map(|r| r.cost).sum();

        Ok(SalesReport {
            range,
            rows,
            total_revenue,
            total_cost,
            total_profit: total_revenue - total_cost,
        })
    }

    pub async fn inventory_value(&self) -> Result<InventoryValueReport, ServiceError> {
        let products: Vec<Product> = load_all(&self.store, Collection::Products).await?;

        let rows: Vec<InventoryValueRow> = products
            .iter()
            .map(|p| InventoryValueRow {
                product_id: p.id_typed(),
                name: p.name().to_string(),
                quantity: p.quantity(),
                avg_cost: p.avg_cost(),
                value: p.stock().value(),
            })
            .collect();

        Ok(InventoryValueReport {
            total_value: rows.iter().map(|r| r.value).sum(),
            rows,
        })
    }

    pub async fn customer_balances(&self) -> Result<BalancesReport, ServiceError> {
        self.balances(PartyKind::Customer).await
    }

    pub async fn supplier_balances(&self) -> Result<BalancesReport, ServiceError> {
        self.balances(PartyKind::Supplier).await
    }

    async fn balances(&self, kind: PartyKind) -> Result<BalancesReport, ServiceError> {
        let parties: Vec<Party> = load_all(&self.store, party_collection(kind)).await?;

        let rows: Vec<BalanceRow> = parties
            .iter()
            .filter(|p| p.balance().is_positive())
            .map(|p| BalanceRow {
                party_id: p.id_typed(),
                name: p.name().to_string(),
                phone: p.contact().phone.clone(),
                balance: p.balance(),
            })
            .collect();

        Ok(BalancesReport {
            kind,
            total: rows.iter().map(|r| r.balance).sum(),
            rows,
        })
    }
}
