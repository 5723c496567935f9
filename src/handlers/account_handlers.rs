use actix_session::Session;
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{csrf, session, validate};
use crate::errors::{AppError, render, render_with_status, see_other};
use crate::medusa::CustomerUpdate;
use crate::state::AuthSession;
use crate::storage::ProfileId;
use crate::templates_structs::{
    AccountTemplate, OrderErrorTemplate, OrderRow, OrderTemplate, PageContext, ProfileValues,
};

const RECENT_ORDERS: u32 = 10;

#[derive(Deserialize)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub csrf_token: String,
}

/// Customer token for a route behind `require_auth`.
async fn token(state: &AppState, session: &Session, profile: &ProfileId) -> Result<String, AppError> {
    session::current_token(session, &state.client(profile))
        .await
        .ok_or_else(|| AppError::Session("Customer not logged in".to_string()))
}

/// Drop every trace of an expired token, then send the shopper to /login.
async fn expired(state: &AppState, session: &Session, profile: &ProfileId) -> HttpResponse {
    AuthSession::new(state.client(profile)).logout().await;
    session::clear_session_token(session);
    session::set_flash(session, "Sesja wygasła. Zaloguj się ponownie.");
    see_other("/login")
}

async fn account_page(
    state: &AppState,
    session: &Session,
    profile: &ProfileId,
    errors: Vec<String>,
    submitted: Option<ProfileValues>,
) -> Result<HttpResponse, AppError> {
    let token = token(state, session, profile).await?;
    let mut auth = AuthSession::new(state.client(profile));
    let customer = match auth.load_customer(&token).await {
        Ok(customer) => customer,
        Err(e) if e.is_unauthorized() => return Ok(expired(state, session, profile).await),
        Err(e) => return Err(e.into()),
    };

    let (orders, orders_error) = match state.medusa.list_orders(&token, RECENT_ORDERS, 0).await {
        Ok(list) => (list.orders.iter().map(OrderRow::from_order).collect(), None),
        Err(e) => {
            log::warn!("Could not load orders for {}: {e}", customer.id);
            (vec![], Some("Nie udało się pobrać historii zamówień".to_string()))
        }
    };

    let ctx = PageContext::build(session, state, profile, "/konto").await;
    let profile_values = submitted.unwrap_or_else(|| ProfileValues::from_customer(&customer));
    let tmpl = AccountTemplate {
        ctx,
        display_name: customer.display_name(),
        profile: profile_values,
        orders,
        orders_error,
        errors,
    };
    render(tmpl)
}

pub async fn page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
) -> Result<HttpResponse, AppError> {
    account_page(&state, &session, &profile, vec![], None).await
}

pub async fn update(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let form = form.into_inner();

    let mut errors: Vec<String> = vec![];
    errors.extend(validate::validate_required(&form.first_name, "Imię", 100));
    errors.extend(validate::validate_required(&form.last_name, "Nazwisko", 100));
    errors.extend(validate::validate_phone(&form.phone));

    if !errors.is_empty() {
        let submitted = ProfileValues {
            email: String::new(),
            first_name: form.first_name,
            last_name: form.last_name,
            phone: form.phone,
        };
        return account_page(&state, &session, &profile, errors, Some(submitted)).await;
    }

    let token = token(&state, &session, &profile).await?;
    let phone = form.phone.trim();
    let update = CustomerUpdate {
        first_name: Some(form.first_name.trim().to_string()),
        last_name: Some(form.last_name.trim().to_string()),
        phone: (!phone.is_empty()).then(|| phone.to_string()),
    };
    match state.medusa.update_customer(&token, &update).await {
        Ok(_) => {
            session::set_flash(&session, "Dane zostały zapisane");
            Ok(see_other("/konto"))
        }
        Err(e) if e.is_unauthorized() => Ok(expired(&state, &session, &profile).await),
        Err(e) => account_page(&state, &session, &profile, vec![e.message], None).await,
    }
}

pub async fn order(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let token = token(&state, &session, &profile).await?;

    match state.medusa.retrieve_order(&order_id, Some(&token)).await {
        Ok(order) => {
            let ctx = PageContext::build(&session, &state, &profile, "/konto").await;
            render(OrderTemplate::new(ctx, &order))
        }
        Err(e) if e.is_unauthorized() => Ok(expired(&state, &session, &profile).await),
        Err(e) => {
            let (status, message) = if e.is_not_found() {
                (StatusCode::NOT_FOUND, "Nie znaleziono zamówienia".to_string())
            } else {
                log::warn!("Could not load order {order_id}: {e}");
                (StatusCode::BAD_GATEWAY, format!("Nie udało się pobrać zamówienia: {}", e.message))
            };
            let ctx = PageContext::build(&session, &state, &profile, "/konto").await;
            render_with_status(OrderErrorTemplate { ctx, message }, status)
        }
    }
}
