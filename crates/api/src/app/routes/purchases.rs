use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use grocer_purchasing::PurchaseId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchases).post(post_purchase))
        .route("/:id", get(get_purchase))
}

pub async fn post_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreatePurchaseRequest>,
) -> axum::response::Response {
    match services.poster.post_purchase(body.into_draft()).await {
        Ok(purchase) => (StatusCode::CREATED, Json(purchase)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_purchases(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.poster.list_purchases().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id, "purchase") {
        Ok(v) => PurchaseId::new(v),
        Err(resp) => return resp,
    };
    match services.poster.get_purchase(id).await {
        Ok(purchase) => (StatusCode::OK, Json(purchase)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
