use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grocer_core::{DomainError, DomainResult, Entity, Money, RecordId};
use grocer_parties::PartyId;
use grocer_products::ProductId;

/// Purchase identifier (auto-increment key of the `purchases` collection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(pub RecordId);

impl PurchaseId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl From<u64> for PurchaseId {
    fn from(raw: u64) -> Self {
        Self(RecordId::new(raw))
    }
}

impl core::fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineDraft {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
}

/// Purchase as entered, before posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub supplier_id: PartyId,
    pub lines: Vec<PurchaseLineDraft>,
    pub occurred_at: DateTime<Utc>,
}

impl PurchaseDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("purchase must have at least one line"));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be positive",
                    i + 1
                )));
            }
            if line.unit_cost.is_negative() {
                return Err(DomainError::validation(format!(
                    "line {}: unit cost cannot be negative",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.unit_cost.times(l.quantity)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    /// Product name at the time of purchase.
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

impl PurchaseLine {
    pub fn line_total(&self) -> Money {
        self.unit_cost.times(self.quantity)
    }
}

/// A posted purchase. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    id: PurchaseId,
    supplier_id: PartyId,
    lines: Vec<PurchaseLine>,
    total: Money,
    occurred_at: DateTime<Utc>,
}

impl Purchase {
    /// `lines` are the draft lines with product names resolved, in draft order.
    pub fn from_draft(
        id: PurchaseId,
        draft: &PurchaseDraft,
        lines: Vec<PurchaseLine>,
    ) -> DomainResult<Purchase> {
        draft.validate()?;
        if lines.len() != draft.lines.len() {
            return Err(DomainError::invariant("resolved lines do not match the draft"));
        }

        let total = Money::try_total(
            lines
                .iter()
                .map(|l| l.unit_cost.try_times(l.quantity))
                .collect::<DomainResult<Vec<_>>>()?,
        )?;

        Ok(Purchase {
            id,
            supplier_id: draft.supplier_id,
            total,
            lines,
            occurred_at: draft.occurred_at,
        })
    }

    pub fn id_typed(&self) -> PurchaseId {
        self.id
    }

    pub fn supplier_id(&self) -> PartyId {
        self.supplier_id
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(lines: &[(u64, i64, i64)]) -> PurchaseDraft {
        PurchaseDraft {
            supplier_id: PartyId::from(1),
            lines: lines
                .iter()
                .map(|(product, qty, cost)| PurchaseLineDraft {
                    product_id: ProductId::from(*product),
                    quantity: *qty,
                    unit_cost: Money::from_minor(*cost),
                })
                .collect(),
            occurred_at: Utc::now(),
        }
    }

    fn resolve(draft: &PurchaseDraft) -> Vec<PurchaseLine> {
        draft
            .lines
            .iter()
            .map(|l| PurchaseLine {
                product_id: l.product_id,
                name: format!("product {}", l.product_id),
                quantity: l.quantity,
                unit_cost: l.unit_cost,
            })
            .collect()
    }

    #[test]
    fn total_sums_lines() {
        let d = draft(&[(1, 10, 150), (2, 3, 1000)]);
        assert_eq!(d.total(), Money::from_minor(4500));

        let purchase = Purchase::from_draft(PurchaseId::new(RecordId::new(5)), &d, resolve(&d)).unwrap();
        assert_eq!(purchase.total(), Money::from_minor(4500));
        assert_eq!(purchase.supplier_id(), PartyId::from(1));
        assert_eq!(purchase.lines()[1].name, "product 2");
    }

    #[test]
    fn rejects_empty_purchase() {
        let d = draft(&[]);
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_quantity_and_negative_cost() {
        match draft(&[(1, 0, 100)]).validate().unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("quantity")),
            other => panic!("expected validation error, got {other:?}"),
        }
        match draft(&[(1, 1, 100), (2, 1, -5)]).validate().unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn free_goods_are_allowed() {
        let d = draft(&[(1, 6, 0)]);
        assert!(d.validate().is_ok());
        assert_eq!(d.total(), Money::ZERO);
    }

    #[test]
    fn total_that_does_not_fit_is_rejected() {
        let d = draft(&[(1, 10_000_000_000, 1_000_000_000)]);
        let err = Purchase::from_draft(PurchaseId::from(1), &d, resolve(&d)).unwrap_err();
        assert_eq!(err, DomainError::invariant("amount overflow"));

        let d = draft(&[(1, 1, i64::MAX), (2, 1, 1)]);
        let err = Purchase::from_draft(PurchaseId::from(1), &d, resolve(&d)).unwrap_err();
        assert_eq!(err, DomainError::invariant("amount overflow"));
    }

    #[test]
    fn mismatched_resolution_is_an_invariant_violation() {
        let d = draft(&[(1, 1, 100), (2, 1, 100)]);
        let mut lines = resolve(&d);
        lines.pop();
        let err = Purchase::from_draft(PurchaseId::new(RecordId::new(1)), &d, lines).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn total_is_sum_of_line_totals(
                lines in proptest::collection::vec((1u64..100, 1i64..1_000, 0i64..100_000), 1..15)
            ) {
                let d = draft(&lines);
                let expected: i64 = lines.iter().map(|(_, q, c)| q * c).sum();
                let purchase = Purchase::from_draft(PurchaseId::new(RecordId::new(1)), &d, resolve(&d)).unwrap();
                prop_assert_eq!(purchase.total(), Money::from_minor(expected));
            }
        }
    }
}
