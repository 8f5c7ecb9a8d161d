//! Sales domain module.
//!
//! A sale is an immutable record written once by the ledger poster. This
//! crate validates drafts and computes totals (no IO, no storage).

pub mod sale;

pub use sale::{
    PaymentMethod, PaymentStatus, Sale, SaleDraft, SaleId, SaleLine, SaleLineDraft,
};
