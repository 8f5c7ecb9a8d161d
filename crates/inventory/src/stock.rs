use core::str::FromStr;

use serde::{Deserialize, Serialize};

use grocer_core::{DomainError, DomainResult, Money, ValueObject};

/// What to do when a sale asks for more units than are in stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderflowPolicy {
    /// Floor stock at zero and record the shortfall.
    #[default]
    Clamp,
    /// Refuse the issue.
    Reject,
}

impl UnderflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnderflowPolicy::Clamp => "clamp",
            UnderflowPolicy::Reject => "reject",
        }
    }
}

impl FromStr for UnderflowPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(UnderflowPolicy::Clamp),
            "reject" => Ok(UnderflowPolicy::Reject),
            other => Err(DomainError::validation(format!(
                "unknown underflow policy '{other}' (expected clamp or reject)"
            ))),
        }
    }
}

/// On-hand quantity and weighted-average unit cost of one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i64,
    pub avg_cost: Money,
}

impl ValueObject for StockLevel {}

/// Outcome of issuing stock for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockIssue {
    pub level: StockLevel,
    /// Units actually taken off the shelf.
    pub issued: i64,
    /// Units requested beyond what was on hand (only non-zero under `Clamp`).
    pub shortfall: i64,
}

impl StockLevel {
    pub fn new(quantity: i64, avg_cost: Money) -> Self {
        Self { quantity, avg_cost }
    }

    /// Stock value at average cost.
    pub fn value(&self) -> Money {
        self.avg_cost.times(self.quantity.max(0))
    }

    /// Receive purchased units and recompute the weighted-average cost:
    ///
    /// `(old_qty * old_avg + qty * cost) / (old_qty + qty)`
    ///
    /// The result is rounded half away from zero to the minor unit.
    pub fn receive(&self, quantity: i64, unit_cost: Money) -> DomainResult<StockLevel> {
        if quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }
        if unit_cost.is_negative() {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }

        let on_hand = self.quantity.max(0);
        let new_quantity = on_hand
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("stock quantity overflow"))?;

        let old_value = i128::from(on_hand) * i128::from(self.avg_cost.minor());
        let added_value = i128::from(quantity) * i128::from(unit_cost.minor());
        let avg = div_round_half_away(old_value + added_value, i128::from(new_quantity));
        let avg = i64::try_from(avg).map_err(|_| DomainError::invariant("average cost overflow"))?;

        Ok(StockLevel {
            quantity: new_quantity,
            avg_cost: Money::from_minor(avg),
        })
    }

    /// Issue sold units. Average cost is unchanged by sales.
    pub fn issue(&self, quantity: i64, policy: UnderflowPolicy) -> DomainResult<StockIssue> {
        if quantity <= 0 {
            return Err(DomainError::validation("issued quantity must be positive"));
        }

        let on_hand = self.quantity.max(0);
        if quantity > on_hand && policy == UnderflowPolicy::Reject {
            return Err(DomainError::invariant(format!(
                "insufficient stock (on hand: {on_hand}, requested: {quantity})"
            )));
        }

        let issued = quantity.min(on_hand);
        Ok(StockIssue {
            level: StockLevel {
                quantity: on_hand - issued,
                avg_cost: self.avg_cost,
            },
            issued,
            shortfall: quantity - issued,
        })
    }
}

fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    #[test]
    fn first_receipt_sets_cost() {
        let level = StockLevel::default().receive(10, m(250)).unwrap();
        assert_eq!(level.quantity, 10);
        assert_eq!(level.avg_cost, m(250));
    }

    #[test]
    fn receipt_computes_weighted_mean() {
        let level = StockLevel::new(10, m(100)).receive(10, m(200)).unwrap();
        assert_eq!(level.quantity, 20);
        assert_eq!(level.avg_cost, m(150));

        let level = StockLevel::new(3, m(100)).receive(1, m(500)).unwrap();
        assert_eq!(level.avg_cost, m(200));
    }

    #[test]
    fn receipt_rounds_half_away_from_zero() {
        // (1*100 + 2*101) / 3 = 100.666.. -> 101
        let level = StockLevel::new(1, m(100)).receive(2, m(101)).unwrap();
        assert_eq!(level.avg_cost, m(101));
        // (1*1 + 1*2) / 2 = 1.5 -> 2
        let level = StockLevel::new(1, m(1)).receive(1, m(2)).unwrap();
        assert_eq!(level.avg_cost, m(2));
    }

    #[test]
    fn receipt_rejects_non_positive_quantity_and_negative_cost() {
        let level = StockLevel::default();
        assert!(matches!(level.receive(0, m(1)), Err(DomainError::Validation(_))));
        assert!(matches!(level.receive(1, m(-1)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn issue_decrements_exact_quantity() {
        let issue = StockLevel::new(10, m(120)).issue(4, UnderflowPolicy::Clamp).unwrap();
        assert_eq!(issue.level.quantity, 6);
        assert_eq!(issue.level.avg_cost, m(120));
        assert_eq!(issue.issued, 4);
        assert_eq!(issue.shortfall, 0);
    }

    #[test]
    fn clamp_floors_at_zero() {
        let issue = StockLevel::new(2, m(120)).issue(5, UnderflowPolicy::Clamp).unwrap();
        assert_eq!(issue.level.quantity, 0);
        assert_eq!(issue.issued, 2);
        assert_eq!(issue.shortfall, 3);
    }

    #[test]
    fn reject_refuses_underflow() {
        let err = StockLevel::new(2, m(120)).issue(5, UnderflowPolicy::Reject).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("insufficient stock") => {}
            other => panic!("expected insufficient stock, got {other:?}"),
        }
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("Clamp".parse::<UnderflowPolicy>().unwrap(), UnderflowPolicy::Clamp);
        assert_eq!(" reject ".parse::<UnderflowPolicy>().unwrap(), UnderflowPolicy::Reject);
        assert!("negative".parse::<UnderflowPolicy>().is_err());
    }

    #[test]
    fn value_is_quantity_times_average() {
        assert_eq!(StockLevel::new(4, m(250)).value(), m(1000));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: the new average is the weighted mean of prior stock value and purchase value.
            #[test]
            fn receipt_is_weighted_mean(
                old_qty in 0i64..10_000,
                old_avg in 0i64..100_000,
                qty in 1i64..10_000,
                cost in 0i64..100_000,
            ) {
                let level = StockLevel::new(old_qty, m(old_avg)).receive(qty, m(cost)).unwrap();
                let total_value = i128::from(old_qty) * i128::from(old_avg) + i128::from(qty) * i128::from(cost);
                let total_qty = i128::from(old_qty + qty);
                let avg = i128::from(level.avg_cost.minor());

                prop_assert_eq!(level.quantity, old_qty + qty);
                // |avg * n - value| <= n / 2 (nearest minor unit)
                prop_assert!((avg * total_qty - total_value).abs() * 2 <= total_qty);
            }

            /// Property: issuing never drives stock negative and never touches the average.
            #[test]
            fn clamp_issue_never_negative(
                on_hand in 0i64..10_000,
                avg in 0i64..100_000,
                qty in 1i64..20_000,
            ) {
                let issue = StockLevel::new(on_hand, m(avg)).issue(qty, UnderflowPolicy::Clamp).unwrap();
                prop_assert!(issue.level.quantity >= 0);
                prop_assert_eq!(issue.issued + issue.shortfall, qty);
                prop_assert_eq!(issue.level.quantity, on_hand - issue.issued);
                prop_assert_eq!(issue.level.avg_cost, m(avg));
            }
        }
    }
}
