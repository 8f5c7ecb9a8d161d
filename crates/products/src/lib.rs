//! Products domain module.
//!
//! Catalog records with an embedded stock level. Pure domain logic: the
//! ledger poster and catalog service load a snapshot, execute a command and
//! store the result.

pub mod product;

pub use product::{
    CreateProduct, IssueStock, Product, ProductCommand, ProductCreated, ProductDetailsUpdated,
    ProductEvent, ProductId, ReceiveStock, StockIssued, StockReceived, UpdateProductDetails,
};
