use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::catalog;
use crate::errors::AppError;
use crate::medusa::ApiError;
use crate::storage::ProfileId;

#[derive(Deserialize)]
pub struct ProductFilter {
    pub product_id: Option<String>,
}

/// Upstream failures keep the `{message, status}` shape of the Medusa client.
fn api_error(e: &ApiError) -> HttpResponse {
    let status = e
        .status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .filter(|s| s.is_client_error())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    HttpResponse::build(status).json(e)
}

pub async fn inventory(state: web::Data<AppState>, query: web::Query<ProductFilter>) -> HttpResponse {
    let product_id = query.product_id.as_deref().filter(|id| !id.is_empty());
    match catalog::fetch_products(&state.medusa, product_id).await {
        Ok(products) => HttpResponse::Ok().json(json!({ "inventory": catalog::inventory_map(&products) })),
        Err(e) => {
            log::error!("Inventory lookup failed: {e}");
            api_error(&e)
        }
    }
}

pub async fn prices(state: web::Data<AppState>, query: web::Query<ProductFilter>) -> HttpResponse {
    let product_id = query.product_id.as_deref().filter(|id| !id.is_empty());
    match catalog::fetch_products(&state.medusa, product_id).await {
        Ok(products) => HttpResponse::Ok().json(json!({ "prices": catalog::price_map(&products) })),
        Err(e) => {
            log::error!("Price lookup failed: {e}");
            api_error(&e)
        }
    }
}

/// Current limiter status for one action of this browser profile.
pub async fn limit_status(
    state: web::Data<AppState>,
    profile: ProfileId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let key = path.into_inner();
    if !state.config.limiter.contains(&key) {
        return Err(AppError::NotFound);
    }
    let status = state.limiter.check_status(&profile, &key).await;
    Ok(HttpResponse::Ok().json(status))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let store = state.store.backend_name();
    match state.medusa.health().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "medusa": "ok",
            "store": store,
        })),
        Err(e) => {
            log::warn!("Medusa health check failed: {e}");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "medusa": e.message,
                "store": store,
            }))
        }
    }
}
