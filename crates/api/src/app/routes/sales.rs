use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use grocer_sales::SaleId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(post_sale))
        .route("/:id", get(get_sale))
}

pub async fn post_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateSaleRequest>,
) -> axum::response::Response {
    match services.poster.post_sale(body.into_draft()).await {
        Ok(sale) => (StatusCode::CREATED, Json(sale)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_sales(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.poster.list_sales().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id(&id, "sale") {
        Ok(v) => SaleId::new(v),
        Err(resp) => return resp,
    };
    match services.poster.get_sale(id).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
