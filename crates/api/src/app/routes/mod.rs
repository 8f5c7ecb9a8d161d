use axum::{Extension, Router, routing::get};

use grocer_parties::PartyKind;

pub mod backup;
pub mod parties;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod system;

/// Router for every store-backed endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/customers", parties::router().layer(Extension(PartyKind::Customer)))
        .nest("/suppliers", parties::router().layer(Extension(PartyKind::Supplier)))
        .nest("/sales", sales::router())
        .nest("/purchases", purchases::router())
        .nest("/reports", reports::router())
        .route("/settings", get(settings::get_settings).put(settings::save_settings))
        .route("/backup", get(backup::export).post(backup::import))
}
