use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use grocer_core::Money;
use grocer_infra::Setting;
use grocer_parties::PartyId;
use grocer_purchasing::{PurchaseDraft, PurchaseLineDraft};
use grocer_sales::{PaymentMethod, SaleDraft, SaleLineDraft};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub barcode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// A sale as posted by the till. `occurred_at` defaults to now.
#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub lines: Vec<SaleLineDraft>,
    #[serde(default)]
    pub discount: Money,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<PartyId>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl CreateSaleRequest {
    pub fn into_draft(self) -> SaleDraft {
        SaleDraft {
            lines: self.lines,
            discount: self.discount,
            payment_method: self.payment_method,
            customer_id: self.customer_id,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub supplier_id: PartyId,
    pub lines: Vec<PurchaseLineDraft>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl CreatePurchaseRequest {
    pub fn into_draft(self) -> PurchaseDraft {
        PurchaseDraft {
            supplier_id: self.supplier_id,
            lines: self.lines,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
        }
    }
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, both optional and inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct SalesReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    pub items: Vec<Setting>,
}
