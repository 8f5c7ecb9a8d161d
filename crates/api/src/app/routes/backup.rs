use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::errors;
use crate::app::services::AppServices;

/// The whole store as `{ "<collection>": [records] }`.
pub async fn export(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.backup.export().await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Replace the whole store with the posted document.
pub async fn import(
    Extension(services): Extension<Arc<AppServices>>,
    Json(doc): Json<serde_json::Value>,
) -> axum::response::Response {
    match services.backup.import(doc).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
