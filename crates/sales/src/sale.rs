use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grocer_core::{DomainError, DomainResult, Entity, Money, RecordId};
use grocer_parties::PartyId;
use grocer_products::ProductId;

/// Sale identifier (auto-increment key of the `sales` collection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub RecordId);

impl SaleId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl From<u64> for SaleId {
    fn from(raw: u64) -> Self {
        Self(RecordId::new(raw))
    }
}

impl core::fmt::Display for SaleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Deferred: added to the customer's balance.
    Credit,
}

impl PaymentMethod {
    pub fn status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Cash | PaymentMethod::Card => PaymentStatus::Paid,
            PaymentMethod::Credit => PaymentStatus::Deferred,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(DomainError::validation(format!("unknown payment method '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Deferred,
}

/// A requested sale line. `unit_price` defaults to the product's sale price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineDraft {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<Money>,
}

/// Sale as submitted at the till, before posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    pub lines: Vec<SaleLineDraft>,
    #[serde(default)]
    pub discount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub customer_id: Option<PartyId>,
    pub occurred_at: DateTime<Utc>,
}

impl SaleDraft {
    /// Checks that do not need the catalog.
    pub fn validate(&self) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("sale must have at least one line"));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be positive",
                    i + 1
                )));
            }
            if line.unit_price.is_some_and(Money::is_negative) {
                return Err(DomainError::validation(format!(
                    "line {}: unit price cannot be negative",
                    i + 1
                )));
            }
        }
        if self.discount.is_negative() {
            return Err(DomainError::validation("discount cannot be negative"));
        }
        if self.payment_method.status() == PaymentStatus::Deferred && self.customer_id.is_none() {
            return Err(DomainError::validation("a credit sale requires a customer"));
        }
        Ok(())
    }
}

/// A posted sale line with the product name, price and cost captured at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Average cost at the moment of sale (profit reporting).
    #[serde(default)]
    pub unit_cost: Money,
}

impl SaleLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    pub fn line_cost(&self) -> Money {
        self.unit_cost.times(self.quantity)
    }
}

/// A posted sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    lines: Vec<SaleLine>,
    subtotal: Money,
    #[serde(default)]
    discount: Money,
    total: Money,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    #[serde(default)]
    customer_id: Option<PartyId>,
    occurred_at: DateTime<Utc>,
}

impl Sale {
    /// Build a sale from a validated draft and the priced lines resolved
    /// against the catalog (same order as the draft lines).
    pub fn from_draft(id: SaleId, draft: &SaleDraft, lines: Vec<SaleLine>) -> DomainResult<Sale> {
        draft.validate()?;
        if lines.len() != draft.lines.len() {
            return Err(DomainError::invariant("priced lines do not match the draft"));
        }

        let subtotal = Money::try_total(
            lines
                .iter()
                .map(|l| l.unit_price.try_times(l.quantity))
                .collect::<DomainResult<Vec<_>>>()?,
        )?;
        // Cost feeds the profit report; it must fit as well.
        Money::try_total(
            lines
                .iter()
                .map(|l| l.unit_cost.try_times(l.quantity))
                .collect::<DomainResult<Vec<_>>>()?,
        )?;
        if draft.discount > subtotal {
            return Err(DomainError::validation(format!(
                "discount {} exceeds subtotal {subtotal}",
                draft.discount
            )));
        }

        Ok(Sale {
            id,
            lines,
            subtotal,
            discount: draft.discount,
            total: subtotal - draft.discount,
            payment_method: draft.payment_method,
            payment_status: draft.payment_method.status(),
            customer_id: draft.customer_id,
            occurred_at: draft.occurred_at,
        })
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Revenue of the sale.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Cost of goods sold at average cost.
    pub fn cost(&self) -> Money {
        self.lines.iter().map(SaleLine::line_cost).sum()
    }

    pub fn profit(&self) -> Money {
        self.total - self.cost()
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn is_deferred(&self) -> bool {
        self.payment_status == PaymentStatus::Deferred
    }

    pub fn customer_id(&self) -> Option<PartyId> {
        self.customer_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn sale_id() -> SaleId {
        SaleId::new(RecordId::new(1))
    }

    fn draft(method: PaymentMethod, customer: Option<u64>, discount: i64) -> SaleDraft {
        SaleDraft {
            lines: vec![
                SaleLineDraft {
                    product_id: ProductId::from(1),
                    quantity: 2,
                    unit_price: None,
                },
                SaleLineDraft {
                    product_id: ProductId::from(2),
                    quantity: 1,
                    unit_price: Some(Money::from_minor(999)),
                },
            ],
            discount: Money::from_minor(discount),
            payment_method: method,
            customer_id: customer.map(PartyId::from),
            occurred_at: test_time(),
        }
    }

    fn priced_lines() -> Vec<SaleLine> {
        vec![
            SaleLine {
                product_id: ProductId::from(1),
                name: "Milk 1L".to_string(),
                quantity: 2,
                unit_price: Money::from_minor(2500),
                unit_cost: Money::from_minor(2000),
            },
            SaleLine {
                product_id: ProductId::from(2),
                name: "Bread".to_string(),
                quantity: 1,
                unit_price: Money::from_minor(999),
                unit_cost: Money::from_minor(600),
            },
        ]
    }

    #[test]
    fn totals_subtract_discount() {
        let sale = Sale::from_draft(sale_id(), &draft(PaymentMethod::Cash, None, 499), priced_lines())
            .unwrap();

        assert_eq!(sale.subtotal(), Money::from_minor(5999));
        assert_eq!(sale.discount(), Money::from_minor(499));
        assert_eq!(sale.total(), Money::from_minor(5500));
        assert_eq!(sale.cost(), Money::from_minor(4600));
        assert_eq!(sale.profit(), Money::from_minor(900));
        assert_eq!(sale.payment_status(), PaymentStatus::Paid);
    }

    #[test]
    fn credit_sale_is_deferred() {
        let sale = Sale::from_draft(sale_id(), &draft(PaymentMethod::Credit, Some(4), 0), priced_lines())
            .unwrap();
        assert!(sale.is_deferred());
        assert_eq!(sale.customer_id(), Some(PartyId::from(4)));
    }

    #[test]
    fn credit_sale_requires_customer() {
        let err = draft(PaymentMethod::Credit, None, 0).validate().unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("requires a customer") => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_sale_and_bad_quantities() {
        let mut empty = draft(PaymentMethod::Cash, None, 0);
        empty.lines.clear();
        assert!(matches!(empty.validate(), Err(DomainError::Validation(_))));

        let mut zero = draft(PaymentMethod::Cash, None, 0);
        zero.lines[1].quantity = 0;
        match zero.validate().unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let err = Sale::from_draft(sale_id(), &draft(PaymentMethod::Cash, None, 6000), priced_lines())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = draft(PaymentMethod::Cash, None, -1).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn subtotal_that_does_not_fit_is_rejected() {
        let mut lines = priced_lines();
        lines[0].quantity = 9_300_000_000_000;
        lines[0].unit_price = Money::from_minor(1_000_000);
        let mut d = draft(PaymentMethod::Credit, Some(4), 0);
        d.lines[0].quantity = lines[0].quantity;

        let err = Sale::from_draft(sale_id(), &d, lines).unwrap_err();
        assert_eq!(err, DomainError::invariant("amount overflow"));
    }

    #[test]
    fn payment_method_parses_case_insensitively() {
        assert_eq!("CARD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn stored_record_keeps_derived_fields() {
        let sale = Sale::from_draft(sale_id(), &draft(PaymentMethod::Credit, Some(4), 0), priced_lines())
            .unwrap();
        let json = serde_json::to_value(&sale).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["payment_status"], "deferred");
        assert_eq!(json["total"], 5999);

        let loaded: Sale = serde_json::from_value(json).unwrap();
        assert_eq!(loaded, sale);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: total == Σ(qty × price) − discount for any admissible discount.
            #[test]
            fn total_is_subtotal_minus_discount(
                lines in proptest::collection::vec((1i64..50, 0i64..10_000), 1..10),
                discount_ratio in 0u32..=100,
            ) {
                let priced: Vec<SaleLine> = lines
                    .iter()
                    .enumerate()
                    .map(|(i, (qty, price))| SaleLine {
                        product_id: ProductId::from(i as u64 + 1),
                        name: format!("item {i}"),
                        quantity: *qty,
                        unit_price: Money::from_minor(*price),
                        unit_cost: Money::ZERO,
                    })
                    .collect();
                let subtotal: i64 = lines.iter().map(|(q, p)| q * p).sum();
                let discount = subtotal * i64::from(discount_ratio) / 100;

                let draft = SaleDraft {
                    lines: priced
                        .iter()
                        .map(|l| SaleLineDraft {
                            product_id: l.product_id,
                            quantity: l.quantity,
                            unit_price: Some(l.unit_price),
                        })
                        .collect(),
                    discount: Money::from_minor(discount),
                    payment_method: PaymentMethod::Cash,
                    customer_id: None,
                    occurred_at: test_time(),
                };

                let sale = Sale::from_draft(sale_id(), &draft, priced).unwrap();
                prop_assert_eq!(sale.subtotal(), Money::from_minor(subtotal));
                prop_assert_eq!(sale.total(), Money::from_minor(subtotal - discount));
                prop_assert!(!sale.total().is_negative());
            }
        }
    }
}
