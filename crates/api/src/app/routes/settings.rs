use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn get_settings(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.settings.all().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Upsert the given settings in one write; keys not listed are untouched.
pub async fn save_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SaveSettingsRequest>,
) -> axum::response::Response {
    if let Err(e) = services.settings.save(body.items).await {
        return errors::service_error_to_response(e);
    }
    get_settings(Extension(services)).await
}
