//! Purchasing domain module.
//!
//! Stock receipts from suppliers. Like sales, a purchase is written once by
//! the ledger poster; this crate validates drafts and computes totals.

pub mod purchase;

pub use purchase::{Purchase, PurchaseDraft, PurchaseId, PurchaseLine, PurchaseLineDraft};
