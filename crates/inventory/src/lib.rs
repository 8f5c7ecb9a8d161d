//! Inventory domain module: stock levels and weighted-average cost.
//!
//! Pure arithmetic shared by the product catalog and the ledger poster
//! (no IO, no storage).

pub mod stock;

pub use stock::{StockIssue, StockLevel, UnderflowPolicy};
