use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use grocer_infra::DateRange;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/sales", get(sales_report))
        .route("/inventory-value", get(inventory_value))
        .route("/customer-balances", get(customer_balances))
        .route("/supplier-balances", get(supplier_balances))
}

pub async fn sales_report(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::SalesReportQuery>,
) -> axum::response::Response {
    let range = match DateRange::new(query.from, query.to) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.reports.sales(range).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn inventory_value(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reports.inventory_value().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn customer_balances(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reports.customer_balances().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn supplier_balances(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reports.supplier_balances().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
