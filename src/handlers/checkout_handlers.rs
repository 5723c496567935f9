use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{csrf, session, validate};
use crate::errors::{AppError, render, see_other};
use crate::medusa::Address;
use crate::state::CartSession;
use crate::storage::ProfileId;
use crate::templates_structs::{
    AddressForm, CartView, CheckoutTemplate, ConfirmationTemplate, PageContext, ShippingRow,
};

#[derive(Deserialize)]
pub struct AddressSubmit {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    #[serde(default)]
    pub address_2: String,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    #[serde(default)]
    pub phone: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct ShippingSubmit {
    pub option_id: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn checkout_page(
    state: &AppState,
    session: &Session,
    profile: &ProfileId,
    mut errors: Vec<String>,
    submitted: Option<AddressForm>,
) -> Result<HttpResponse, AppError> {
    let client = state.client(profile);
    let mut carts = CartSession::new(client, state.config.region_id.clone());
    let cart_state = carts.load().await;
    let Some(cart) = cart_state.cart.clone().filter(|c| !c.items.is_empty()) else {
        if let Some(e) = &cart_state.error {
            session::set_flash(session, &e.message);
        }
        return Ok(see_other("/koszyk"));
    };

    let mut address = submitted.unwrap_or_else(|| AddressForm::from_cart(&cart));
    if address.email.is_empty() {
        if let Some(token) = session::current_token(session, &client).await {
            if let Ok(customer) = state.medusa.retrieve_customer(&token).await {
                address.email = customer.email;
            }
        }
    }

    let has_address = cart
        .shipping_address
        .as_ref()
        .is_some_and(|a| a.address_1.is_some());
    let shipping_options = if has_address {
        match state.medusa.shipping_options(&cart.id).await {
            Ok(options) => options
                .iter()
                .map(|o| ShippingRow::new(o, &cart.currency_code, &cart))
                .collect(),
            Err(e) => {
                log::warn!("Shipping options for cart {} unavailable: {e}", cart.id);
                errors.push("Nie udało się pobrać metod dostawy".to_string());
                vec![]
            }
        }
    } else {
        vec![]
    };

    let ctx = PageContext::build(session, state, profile, "/checkout").await;
    render(CheckoutTemplate {
        ctx,
        summary: CartView::from_cart(&cart),
        address,
        has_address,
        shipping_options,
        has_shipping: !cart.shipping_methods.is_empty(),
        ready: cart.is_ready_for_completion(),
        errors,
    })
}

pub async fn page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
) -> Result<HttpResponse, AppError> {
    checkout_page(&state, &session, &profile, vec![], None).await
}

pub async fn address(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<AddressSubmit>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let form = form.into_inner();
    let country = form.country_code.trim().to_lowercase();

    let mut errors: Vec<String> = vec![];
    errors.extend(validate::validate_email(&form.email));
    errors.extend(validate::validate_required(&form.first_name, "Imię", 100));
    errors.extend(validate::validate_required(&form.last_name, "Nazwisko", 100));
    errors.extend(validate::validate_required(&form.address_1, "Adres", 200));
    errors.extend(validate::validate_optional(&form.address_2, "Adres (cd.)", 200));
    errors.extend(validate::validate_required(&form.city, "Miasto", 100));
    errors.extend(validate::validate_country_code(&country));
    errors.extend(validate::validate_postal_code(&form.postal_code, &country));
    errors.extend(validate::validate_phone(&form.phone));

    if !errors.is_empty() {
        let submitted = AddressForm {
            email: form.email,
            first_name: form.first_name,
            last_name: form.last_name,
            address_1: form.address_1,
            address_2: form.address_2,
            city: form.city,
            postal_code: form.postal_code,
            country_code: country,
            phone: form.phone,
        };
        return checkout_page(&state, &session, &profile, errors, Some(submitted)).await;
    }

    let address = Address {
        first_name: optional(&form.first_name),
        last_name: optional(&form.last_name),
        address_1: optional(&form.address_1),
        address_2: optional(&form.address_2),
        city: optional(&form.city),
        postal_code: optional(&form.postal_code),
        country_code: Some(country),
        phone: optional(&form.phone),
    };

    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    match cart.set_contact(form.email.trim(), address).await {
        Ok(()) => Ok(see_other("/checkout")),
        Err(e) => checkout_page(&state, &session, &profile, vec![e.message], None).await,
    }
}

pub async fn shipping(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<ShippingSubmit>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    if form.option_id.trim().is_empty() {
        let errors = vec!["Wybierz sposób dostawy".to_string()];
        return checkout_page(&state, &session, &profile, errors, None).await;
    }

    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    match cart.set_shipping(&form.option_id).await {
        Ok(()) => Ok(see_other("/checkout")),
        Err(e) => checkout_page(&state, &session, &profile, vec![e.message], None).await,
    }
}

pub async fn place_order(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let mut cart = CartSession::new(state.client(&profile), state.config.region_id.clone());
    match cart.complete(&state.config.payment_provider).await {
        Ok(order) => Ok(see_other(&format!("/checkout/potwierdzenie/{}", order.id))),
        Err(e) => checkout_page(&state, &session, &profile, vec![e.message], None).await,
    }
}

pub async fn confirmation(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let token = session::current_token(&session, &state.client(&profile)).await;
    let order = state.medusa.retrieve_order(&order_id, token.as_deref()).await?;

    let ctx = PageContext::build(&session, &state, &profile, "/checkout").await;
    render(ConfirmationTemplate {
        ctx,
        number: order.number(),
        email: order.email.clone().unwrap_or_default(),
        summary: CartView::from_order(&order),
    })
}
