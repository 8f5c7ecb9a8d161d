//! Customers and suppliers share one set of handlers; the router is nested
//! twice with the `PartyKind` supplied as an extension.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use grocer_infra::PartyDetails;
use grocer_parties::{PartyId, PartyKind};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parties).post(register_party))
        .route("/:id", get(get_party).put(update_party).delete(delete_party))
        .route("/:id/payments", post(record_payment))
}

fn party_id(raw: &str, kind: PartyKind) -> Result<PartyId, axum::response::Response> {
    errors::parse_id(raw, kind.as_str()).map(PartyId::new)
}

pub async fn list_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
) -> axum::response::Response {
    match services.directory.list(kind).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn register_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Json(body): Json<PartyDetails>,
) -> axum::response::Response {
    match services.directory.register(kind, body).await {
        Ok(party) => (StatusCode::CREATED, Json(party)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match party_id(&id, kind) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.directory.get(kind, id).await {
        Ok(party) => (StatusCode::OK, Json(party)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Path(id): Path<String>,
    Json(body): Json<PartyDetails>,
) -> axum::response::Response {
    let id = match party_id(&id, kind) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.directory.update(kind, id, body).await {
        Ok(party) => (StatusCode::OK, Json(party)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match party_id(&id, kind) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.directory.delete(kind, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Money received from a customer, or paid to a supplier.
pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Path(id): Path<String>,
    Json(body): Json<dto::PaymentRequest>,
) -> axum::response::Response {
    let id = match party_id(&id, kind) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let occurred_at = body.occurred_at.unwrap_or_else(Utc::now);
    let result = match kind {
        PartyKind::Customer => services.poster.record_customer_payment(id, body.amount, occurred_at).await,
        PartyKind::Supplier => services.poster.record_supplier_payment(id, body.amount, occurred_at).await,
    };
    match result {
        Ok(party) => (StatusCode::OK, Json(party)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
