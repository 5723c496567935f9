use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{csrf, session, validate};
use crate::errors::{AppError, render, see_other};
use crate::medusa::ApiResult;
use crate::state::CartSession;
use crate::storage::ProfileId;
use crate::templates_structs::{CartTemplate, CartView, PageContext};

#[derive(Deserialize)]
pub struct AddForm {
    pub variant_id: String,
    pub quantity: i64,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct QuantityForm {
    pub quantity: i64,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct CartSummary {
    pub cart_id: Option<String>,
    pub item_count: i64,
    pub total: f64,
    pub currency_code: Option<String>,
    pub error: Option<String>,
}

/// Flash the outcome of a cart mutation and go back to the cart.
fn after_mutation(session: &Session, result: ApiResult<()>, success: &str) -> HttpResponse {
    match result {
        Ok(()) => session::set_flash(session, success),
        Err(e) => {
            log::warn!("Cart update failed: {e}");
            session::set_flash(session, &e.message);
        }
    }
    see_other("/koszyk")
}

pub async fn page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
) -> Result<HttpResponse, AppError> {
    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    let cart_state = cart.load().await;
    let view = cart_state.cart.as_ref().map(CartView::from_cart);
    let error = cart_state.error.as_ref().map(|e| e.message.clone());

    let ctx = PageContext::build(&session, &state, &profile, "/koszyk").await;
    render(CartTemplate { ctx, cart: view, error })
}

pub async fn add(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<AddForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    if let Some(error) = validate::validate_quantity(form.quantity) {
        session::set_flash(&session, &error);
        return Ok(see_other("/koszyk"));
    }

    let client = state.client(&profile);
    let token = session::current_token(&session, &client).await;
    let mut cart = CartSession::new(client, state.config.region_id.clone());
    let result = cart.add_item(&form.variant_id, form.quantity, token.as_deref()).await;
    Ok(after_mutation(&session, result, "Dodano do koszyka"))
}

pub async fn update(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    path: web::Path<String>,
    form: web::Form<QuantityForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    // Zero removes the line, so only the upper bound is checked here.
    if form.quantity > 0 {
        if let Some(error) = validate::validate_quantity(form.quantity) {
            session::set_flash(&session, &error);
            return Ok(see_other("/koszyk"));
        }
    }

    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    let result = cart.update_item(&path.into_inner(), form.quantity).await;
    Ok(after_mutation(&session, result, "Koszyk zaktualizowany"))
}

pub async fn remove(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    path: web::Path<String>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    let result = cart.remove_item(&path.into_inner()).await;
    Ok(after_mutation(&session, result, "Usunięto z koszyka"))
}

/// Cart badge data for the header.
pub async fn summary(state: web::Data<AppState>, profile: ProfileId) -> HttpResponse {
    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    let cart_state = cart.load().await;
    let summary = CartSummary {
        cart_id: cart_state.cart.as_ref().map(|c| c.id.clone()),
        item_count: cart_state.item_count(),
        total: cart_state.cart.as_ref().map_or(0.0, |c| c.total),
        currency_code: cart_state.cart.as_ref().map(|c| c.currency_code.clone()),
        error: cart_state.error.as_ref().map(|e| e.message.clone()),
    };
    HttpResponse::Ok().json(summary)
}
