//! Shared test infrastructure.
//!
//! - `spawn_medusa()` - a small in-process Medusa Store API on an ephemeral port
//! - `app_state()` - application state wired to that mock, a memory store and a manual clock
//! - `storefront!` - the full actix app under test
//! - `CookieJar` / `send()` - carry cookies between requests like a browser does

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::test::{self, TestRequest};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use regex::Regex;
use serde_json::{Value, json};

use sklep::app::AppState;
use sklep::auth::rate_limit::ManualClock;
use sklep::config::Config;
use sklep::medusa::MedusaClient;
use sklep::storage::{ClientStore, ProfileId};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const PUBLISHABLE_KEY: &str = "pk_test_sklep";
pub const CUSTOMER_ID: &str = "cus_anna";
pub const CUSTOMER_EMAIL: &str = "anna@example.com";
pub const CUSTOMER_PASSWORD: &str = "Haslo1234";
pub const CUSTOMER_TOKEN: &str = "tok_anna";
pub const REGISTRATION_TOKEN: &str = "tok_registration";
pub const RESET_TOKEN: &str = "tok_reset";
pub const TAKEN_EMAIL: &str = "zajety@example.com";
pub const REGION_ID: &str = "reg_pl";
pub const SHIPPING_OPTION: &str = "so_inpost";
pub const SEED_ORDER: &str = "order_seed";

/// Nothing listens on the discard port.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

pub const START_MS: i64 = 1_700_000_000_000;

// ============================================================================
// MOCK MEDUSA
// ============================================================================

#[derive(Clone)]
struct MockLine {
    id: String,
    variant_id: String,
    quantity: i64,
}

#[derive(Clone, Default)]
struct MockCart {
    id: String,
    region_id: String,
    email: Option<String>,
    customer_id: Option<String>,
    items: Vec<MockLine>,
    address: Option<Value>,
    shipping_option: Option<String>,
    payment_collection: Option<Value>,
}

struct MockAccount {
    password: String,
    customer: Option<Value>,
}

#[derive(Default)]
struct MockData {
    accounts: HashMap<String, MockAccount>,
    /// Bearer token -> e-mail of the account it was issued for.
    tokens: HashMap<String, String>,
    carts: HashMap<String, MockCart>,
    orders: Vec<Value>,
    next_id: u32,
    calls: Vec<String>,
    products_down: bool,
    auth_down: bool,
}

impl MockData {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn customer_for(&self, token: Option<&str>) -> Option<Value> {
        let email = self.tokens.get(token?)?;
        self.accounts.get(email)?.customer.clone()
    }
}

/// In-memory stand-in for the Medusa Store API.
pub struct MockMedusa {
    data: Mutex<MockData>,
}

impl MockMedusa {
    /// One registered customer (Anna) with one past order.
    fn seeded() -> Self {
        let mut data = MockData::default();
        data.accounts.insert(
            CUSTOMER_EMAIL.to_string(),
            MockAccount {
                password: CUSTOMER_PASSWORD.to_string(),
                customer: Some(customer_json()),
            },
        );
        data.accounts.insert(
            TAKEN_EMAIL.to_string(),
            MockAccount {
                password: CUSTOMER_PASSWORD.to_string(),
                customer: None,
            },
        );
        data.tokens
            .insert(CUSTOMER_TOKEN.to_string(), CUSTOMER_EMAIL.to_string());
        Self {
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockData> {
        self.data.lock().unwrap()
    }

    fn record(&self, req: &HttpRequest) {
        let call = format!("{} {}", req.method(), req.path());
        self.lock().calls.push(call);
    }

    /// Every `METHOD /path` received so far.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == call).count()
    }

    /// Make `/store/products` answer 500 until switched back.
    pub fn set_products_down(&self, down: bool) {
        self.lock().products_down = down;
    }

    /// Make the e-mail/password auth routes answer 503 until switched back.
    pub fn set_auth_down(&self, down: bool) {
        self.lock().auth_down = down;
    }

    pub fn cart_exists(&self, cart_id: &str) -> bool {
        self.lock().carts.contains_key(cart_id)
    }

    pub fn cart_customer(&self, cart_id: &str) -> Option<String> {
        self.lock().carts.get(cart_id).and_then(|c| c.customer_id.clone())
    }

    pub fn drop_cart(&self, cart_id: &str) {
        self.lock().carts.remove(cart_id);
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }
}

fn variant_price(variant_id: &str) -> Option<(f64, &'static str, &'static str)> {
    match variant_id {
        "var_mug_white" => Some((39.0, "Kubek", "Biały")),
        "var_mug_black" => Some((39.0, "Kubek", "Czarny")),
        "var_tee_m" => Some((89.0, "Koszulka", "M")),
        "var_tee_l" => Some((89.0, "Koszulka", "L")),
        _ => None,
    }
}

pub fn product_fixtures() -> Vec<Value> {
    vec![
        json!({
            "id": "prod_mug",
            "title": "Kubek",
            "handle": "kubek",
            "description": "Kubek ceramiczny 330 ml",
            "thumbnail": "https://cdn.example.com/kubek.jpg",
            "variants": [
                {
                    "id": "var_mug_white",
                    "title": "Biały",
                    "sku": "MUG-W",
                    "manage_inventory": true,
                    "allow_backorder": false,
                    "inventory_quantity": 5,
                    "prices": [
                        { "id": "price_mug_white", "currency_code": "pln", "amount": 39.0 }
                    ],
                    "calculated_price": {
                        "id": "pset_mug_white",
                        "calculated_amount": 39.0,
                        "original_amount": 45.0,
                        "currency_code": "pln"
                    }
                },
                {
                    "id": "var_mug_black",
                    "title": "Czarny",
                    "sku": "MUG-B",
                    "manage_inventory": true,
                    "allow_backorder": false,
                    "inventory_quantity": 0,
                    "prices": [
                        { "id": "price_mug_black", "currency_code": "pln", "amount": 39.0 },
                        { "id": "price_mug_black_bulk", "currency_code": "pln", "amount": 35.0, "min_quantity": 10 }
                    ]
                }
            ]
        }),
        json!({
            "id": "prod_tee",
            "title": "Koszulka",
            "handle": "koszulka",
            "description": null,
            "thumbnail": null,
            "variants": [
                {
                    "id": "var_tee_m",
                    "title": "M",
                    "manage_inventory": false,
                    "allow_backorder": false,
                    "inventory_quantity": null,
                    "prices": [
                        { "id": "price_tee_m_pln", "currency_code": "pln", "amount": 89.0 },
                        { "id": "price_tee_m_eur", "currency_code": "eur", "amount": 21.0 }
                    ]
                },
                {
                    "id": "var_tee_l",
                    "title": "L",
                    "manage_inventory": true,
                    "allow_backorder": true,
                    "inventory_quantity": 0,
                    "prices": [
                        { "id": "price_tee_l_pln", "currency_code": "pln", "amount": 89.0 }
                    ]
                }
            ]
        }),
    ]
}

fn customer_json() -> Value {
    json!({
        "id": CUSTOMER_ID,
        "email": CUSTOMER_EMAIL,
        "first_name": "Anna",
        "last_name": "Nowak",
        "phone": null
    })
}

fn seed_order() -> Value {
    json!({
        "id": SEED_ORDER,
        "display_id": 1001,
        "status": "completed",
        "email": CUSTOMER_EMAIL,
        "currency_code": "pln",
        "created_at": "2026-09-01T10:00:00.000Z",
        "items": [
            { "id": "li_seed", "title": "Kubek", "variant_id": "var_mug_white", "variant_title": "Biały",
              "quantity": 2, "unit_price": 39.0, "total": 78.0 }
        ],
        "shipping_address": {
            "first_name": "Anna", "last_name": "Nowak", "address_1": "ul. Długa 5",
            "city": "Gdańsk", "postal_code": "80-001", "country_code": "pl"
        },
        "shipping_methods": [ { "id": "sm_seed", "name": "InPost Paczkomat", "amount": 12.99 } ],
        "subtotal": 78.0,
        "shipping_total": 12.99,
        "tax_total": 0.0,
        "total": 90.99
    })
}

fn shipping_amount(option_id: &str) -> Option<(f64, &'static str)> {
    match option_id {
        SHIPPING_OPTION => Some((12.99, "InPost Paczkomat")),
        "so_courier" => Some((19.99, "Kurier DPD")),
        _ => None,
    }
}

fn cart_json(cart: &MockCart) -> Value {
    let items: Vec<Value> = cart
        .items
        .iter()
        .map(|line| {
            let (price, title, variant_title) = variant_price(&line.variant_id).unwrap_or((0.0, "?", "?"));
            json!({
                "id": line.id,
                "title": title,
                "variant_id": line.variant_id,
                "variant_title": variant_title,
                "quantity": line.quantity,
                "unit_price": price,
                "total": price * line.quantity as f64
            })
        })
        .collect();
    let subtotal: f64 = cart
        .items
        .iter()
        .map(|l| variant_price(&l.variant_id).map_or(0.0, |p| p.0) * l.quantity as f64)
        .sum();
    let shipping_methods: Vec<Value> = cart
        .shipping_option
        .iter()
        .filter_map(|id| shipping_amount(id).map(|(amount, name)| (id, amount, name)))
        .map(|(id, amount, name)| json!({ "id": format!("sm_{id}"), "name": name, "shipping_option_id": id, "amount": amount }))
        .collect();
    let shipping_total: f64 = cart
        .shipping_option
        .as_deref()
        .and_then(shipping_amount)
        .map_or(0.0, |s| s.0);

    json!({
        "id": cart.id,
        "email": cart.email,
        "currency_code": "pln",
        "region_id": cart.region_id,
        "customer_id": cart.customer_id,
        "items": items,
        "shipping_address": cart.address,
        "billing_address": cart.address,
        "shipping_methods": shipping_methods,
        "payment_collection": cart.payment_collection,
        "subtotal": subtotal,
        "shipping_total": shipping_total,
        "tax_total": 0.0,
        "discount_total": 0.0,
        "total": subtotal + shipping_total
    })
}

fn bearer(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn error(status: StatusCode, kind: &str, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "type": kind, "message": message }))
}

fn unauthorized() -> HttpResponse {
    error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
}

fn cart_not_found(cart_id: &str) -> HttpResponse {
    error(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("Cart id not found: {cart_id}"),
    )
}

/// Store routes demand the publishable key, as Medusa v2 does.
fn missing_key(req: &HttpRequest) -> Option<HttpResponse> {
    let key = req
        .headers()
        .get("x-publishable-api-key")
        .and_then(|v| v.to_str().ok());
    (key != Some(PUBLISHABLE_KEY)).then(|| {
        error(
            StatusCode::BAD_REQUEST,
            "not_allowed",
            "Publishable API key required in the request header: x-publishable-api-key.",
        )
    })
}

fn auth_unavailable() -> HttpResponse {
    error(StatusCode::SERVICE_UNAVAILABLE, "unknown_error", "Auth provider unavailable")
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

async fn login(req: HttpRequest, mock: web::Data<MockMedusa>, body: web::Json<Value>) -> HttpResponse {
    mock.record(&req);
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let mut data = mock.lock();
    if data.auth_down {
        return auth_unavailable();
    }
    let valid = data
        .accounts
        .get(email)
        .is_some_and(|a| a.password == password && a.customer.is_some());
    if !valid {
        return error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid email or password");
    }
    let token = if email == CUSTOMER_EMAIL {
        CUSTOMER_TOKEN.to_string()
    } else {
        data.next("tok")
    };
    data.tokens.insert(token.clone(), email.to_string());
    HttpResponse::Ok().json(json!({ "token": token }))
}

async fn register_identity(req: HttpRequest, mock: web::Data<MockMedusa>, body: web::Json<Value>) -> HttpResponse {
    mock.record(&req);
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut data = mock.lock();
    if data.auth_down {
        return auth_unavailable();
    }
    if data.accounts.contains_key(&email) {
        return error(StatusCode::UNAUTHORIZED, "unauthorized", "Identity with email already exists");
    }
    data.accounts.insert(
        email,
        MockAccount {
            password: body["password"].as_str().unwrap_or_default().to_string(),
            customer: None,
        },
    );
    HttpResponse::Ok().json(json!({ "token": REGISTRATION_TOKEN }))
}

async fn request_reset(req: HttpRequest, mock: web::Data<MockMedusa>) -> HttpResponse {
    mock.record(&req);
    HttpResponse::Created().finish()
}

async fn update_password(req: HttpRequest, mock: web::Data<MockMedusa>) -> HttpResponse {
    mock.record(&req);
    if bearer(&req).as_deref() == Some(RESET_TOKEN) {
        HttpResponse::Ok().json(json!({ "success": true }))
    } else {
        error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid token")
    }
}

async fn create_customer(req: HttpRequest, mock: web::Data<MockMedusa>, body: web::Json<Value>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    if bearer(&req).as_deref() != Some(REGISTRATION_TOKEN) {
        return unauthorized();
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut data = mock.lock();
    let id = data.next("cus");
    let Some(account) = data.accounts.get_mut(&email) else {
        return unauthorized();
    };
    let customer = json!({
        "id": id,
        "email": email,
        "first_name": body["first_name"],
        "last_name": body["last_name"],
        "phone": body.get("phone").cloned().unwrap_or(Value::Null)
    });
    account.customer = Some(customer.clone());
    HttpResponse::Ok().json(json!({ "customer": customer }))
}

async fn me(req: HttpRequest, mock: web::Data<MockMedusa>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    match mock.lock().customer_for(bearer(&req).as_deref()) {
        Some(customer) => HttpResponse::Ok().json(json!({ "customer": customer })),
        None => unauthorized(),
    }
}

async fn update_me(req: HttpRequest, mock: web::Data<MockMedusa>, body: web::Json<Value>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let Some(mut customer) = mock.lock().customer_for(bearer(&req).as_deref()) else {
        return unauthorized();
    };
    for field in ["first_name", "last_name", "phone"] {
        if let Some(value) = body.get(field) {
            customer[field] = value.clone();
        }
    }
    HttpResponse::Ok().json(json!({ "customer": customer }))
}

async fn products(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    if mock.lock().products_down {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "unknown_error", "An unknown error occurred.");
    }

    let param = |name: &str| query.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
    let ids: Vec<String> = query
        .iter()
        .filter(|(k, _)| k == "id[]")
        .map(|(_, v)| v.clone())
        .collect();
    let limit: usize = param("limit").and_then(|v| v.parse().ok()).unwrap_or(50);
    let offset: usize = param("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let handle = param("handle");
    let q = param("q").map(|q| q.to_lowercase());

    let matching: Vec<Value> = product_fixtures()
        .into_iter()
        .filter(|p| ids.is_empty() || ids.iter().any(|id| p["id"] == id.as_str()))
        .filter(|p| handle.as_deref().is_none_or(|h| p["handle"] == h))
        .filter(|p| {
            q.as_deref().is_none_or(|q| {
                p["title"].as_str().unwrap_or_default().to_lowercase().contains(q)
            })
        })
        .collect();
    let count = matching.len();
    let page: Vec<Value> = matching.into_iter().skip(offset).take(limit).collect();
    HttpResponse::Ok().json(json!({ "products": page, "count": count, "offset": offset, "limit": limit }))
}

async fn regions(req: HttpRequest, mock: web::Data<MockMedusa>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    HttpResponse::Ok().json(json!({
        "regions": [ { "id": REGION_ID, "name": "Polska", "currency_code": "pln" } ]
    }))
}

async fn create_cart(req: HttpRequest, mock: web::Data<MockMedusa>, body: web::Json<Value>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let mut data = mock.lock();
    let cart = MockCart {
        id: data.next("cart"),
        region_id: body["region_id"].as_str().unwrap_or(REGION_ID).to_string(),
        ..MockCart::default()
    };
    let customer_id = data
        .customer_for(bearer(&req).as_deref())
        .and_then(|c| c["id"].as_str().map(str::to_string));
    let cart = MockCart { customer_id, ..cart };
    let resp = json!({ "cart": cart_json(&cart) });
    data.carts.insert(cart.id.clone(), cart);
    HttpResponse::Ok().json(resp)
}

async fn get_cart(req: HttpRequest, mock: web::Data<MockMedusa>, path: web::Path<String>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = path.into_inner();
    match mock.lock().carts.get(&cart_id) {
        Some(cart) => HttpResponse::Ok().json(json!({ "cart": cart_json(cart) })),
        None => cart_not_found(&cart_id),
    }
}

async fn update_cart(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = path.into_inner();
    let mut data = mock.lock();
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    if let Some(email) = body["email"].as_str() {
        cart.email = Some(email.to_string());
    }
    if body["shipping_address"].is_object() {
        cart.address = Some(body["shipping_address"].clone());
    }
    HttpResponse::Ok().json(json!({ "cart": cart_json(cart) }))
}

async fn add_line(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = path.into_inner();
    let variant_id = body["variant_id"].as_str().unwrap_or_default().to_string();
    let quantity = body["quantity"].as_i64().unwrap_or(1);
    if variant_price(&variant_id).is_none() {
        return error(
            StatusCode::BAD_REQUEST,
            "invalid_data",
            &format!("Variants with IDs {variant_id} do not exist"),
        );
    }

    let mut data = mock.lock();
    let line_id = data.next("li");
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    match cart.items.iter_mut().find(|l| l.variant_id == variant_id) {
        Some(line) => line.quantity += quantity,
        None => cart.items.push(MockLine {
            id: line_id,
            variant_id,
            quantity,
        }),
    }
    HttpResponse::Ok().json(json!({ "cart": cart_json(cart) }))
}

async fn update_line(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let (cart_id, line_id) = path.into_inner();
    let mut data = mock.lock();
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    let Some(line) = cart.items.iter_mut().find(|l| l.id == line_id) else {
        return error(StatusCode::NOT_FOUND, "not_found", "Line item not found");
    };
    line.quantity = body["quantity"].as_i64().unwrap_or(line.quantity);
    HttpResponse::Ok().json(json!({ "cart": cart_json(cart) }))
}

async fn delete_line(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let (cart_id, line_id) = path.into_inner();
    let mut data = mock.lock();
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    cart.items.retain(|l| l.id != line_id);
    HttpResponse::Ok().json(json!({
        "id": line_id,
        "object": "line-item",
        "deleted": true,
        "parent": cart_json(cart)
    }))
}

async fn shipping_options(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let Some(cart_id) = query.get("cart_id") else {
        return error(StatusCode::BAD_REQUEST, "invalid_data", "cart_id is required");
    };
    if !mock.cart_exists(cart_id) {
        return cart_not_found(cart_id);
    }
    HttpResponse::Ok().json(json!({
        "shipping_options": [
            { "id": SHIPPING_OPTION, "name": "InPost Paczkomat", "amount": 12.99 },
            { "id": "so_courier", "name": "Kurier DPD", "amount": 19.99 }
        ]
    }))
}

async fn add_shipping(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = path.into_inner();
    let option_id = body["option_id"].as_str().unwrap_or_default().to_string();
    if shipping_amount(&option_id).is_none() {
        return error(StatusCode::BAD_REQUEST, "invalid_data", "Shipping option not available");
    }
    let mut data = mock.lock();
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    cart.shipping_option = Some(option_id);
    HttpResponse::Ok().json(json!({ "cart": cart_json(cart) }))
}

async fn create_payment_collection(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    body: web::Json<Value>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = body["cart_id"].as_str().unwrap_or_default().to_string();
    let mut data = mock.lock();
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    let collection = json!({ "id": format!("paycol_{cart_id}"), "payment_sessions": [] });
    cart.payment_collection = Some(collection.clone());
    HttpResponse::Ok().json(json!({ "payment_collection": collection }))
}

async fn create_payment_session(
    req: HttpRequest,
    mock: web::Data<MockMedusa>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let collection_id = path.into_inner();
    let provider_id = body["provider_id"].as_str().unwrap_or_default().to_string();
    let mut data = mock.lock();
    let Some(cart) = data
        .carts
        .values_mut()
        .find(|c| c.payment_collection.as_ref().is_some_and(|p| p["id"] == collection_id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, "not_found", "Payment collection not found");
    };
    let collection = json!({
        "id": collection_id,
        "payment_sessions": [ { "id": "payses_1", "provider_id": provider_id } ]
    });
    cart.payment_collection = Some(collection.clone());
    HttpResponse::Ok().json(json!({ "payment_collection": collection }))
}

async fn complete(req: HttpRequest, mock: web::Data<MockMedusa>, path: web::Path<String>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = path.into_inner();
    let mut data = mock.lock();
    let Some(cart) = data.carts.get(&cart_id).cloned() else {
        return cart_not_found(&cart_id);
    };

    let has_session = cart
        .payment_collection
        .as_ref()
        .is_some_and(|p| p["payment_sessions"].as_array().is_some_and(|s| !s.is_empty()));
    if !has_session || cart.shipping_option.is_none() {
        return HttpResponse::Ok().json(json!({
            "type": "cart",
            "cart": cart_json(&cart),
            "error": { "message": "Payment authorization failed", "name": "PaymentError", "type": "payment_authorization_error" }
        }));
    }

    let order_number = 1001 + data.orders.len() as i64 + 1;
    let order_id = data.next("order");
    let totals = cart_json(&cart);
    let order = json!({
        "id": order_id,
        "display_id": order_number,
        "status": "pending",
        "email": cart.email,
        "customer_id": cart.customer_id,
        "currency_code": "pln",
        "created_at": "2026-10-16T12:00:00.000Z",
        "items": totals["items"],
        "shipping_address": cart.address,
        "shipping_methods": totals["shipping_methods"],
        "subtotal": totals["subtotal"],
        "shipping_total": totals["shipping_total"],
        "tax_total": 0.0,
        "total": totals["total"]
    });
    data.orders.push(order.clone());
    data.carts.remove(&cart_id);
    HttpResponse::Ok().json(json!({ "type": "order", "order": order }))
}

async fn transfer(req: HttpRequest, mock: web::Data<MockMedusa>, path: web::Path<String>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let cart_id = path.into_inner();
    let mut data = mock.lock();
    let Some(customer) = data.customer_for(bearer(&req).as_deref()) else {
        return unauthorized();
    };
    let Some(cart) = data.carts.get_mut(&cart_id) else {
        return cart_not_found(&cart_id);
    };
    cart.customer_id = customer["id"].as_str().map(str::to_string);
    HttpResponse::Ok().json(json!({ "cart": cart_json(cart) }))
}

async fn list_orders(req: HttpRequest, mock: web::Data<MockMedusa>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let data = mock.lock();
    let Some(customer) = data.customer_for(bearer(&req).as_deref()) else {
        return unauthorized();
    };
    let mut orders: Vec<Value> = data
        .orders
        .iter()
        .filter(|o| o["customer_id"] == customer["id"])
        .cloned()
        .collect();
    if customer["id"] == CUSTOMER_ID {
        orders.push(seed_order());
    }
    let count = orders.len();
    HttpResponse::Ok().json(json!({ "orders": orders, "count": count, "offset": 0, "limit": 10 }))
}

async fn get_order(req: HttpRequest, mock: web::Data<MockMedusa>, path: web::Path<String>) -> HttpResponse {
    mock.record(&req);
    if let Some(resp) = missing_key(&req) {
        return resp;
    }
    let order_id = path.into_inner();
    if order_id == SEED_ORDER {
        return HttpResponse::Ok().json(json!({ "order": seed_order() }));
    }
    let found = mock.lock().orders.iter().find(|o| o["id"] == order_id.as_str()).cloned();
    match found {
        Some(order) => HttpResponse::Ok().json(json!({ "order": order })),
        None => error(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("Order with id: {order_id} was not found"),
        ),
    }
}

fn mock_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/auth/customer/emailpass", web::post().to(login))
        .route("/auth/customer/emailpass/register", web::post().to(register_identity))
        .route("/auth/customer/emailpass/reset-password", web::post().to(request_reset))
        .route("/auth/customer/emailpass/update", web::post().to(update_password))
        .route("/store/customers", web::post().to(create_customer))
        .route("/store/customers/me", web::get().to(me))
        .route("/store/customers/me", web::post().to(update_me))
        .route("/store/products", web::get().to(products))
        .route("/store/regions", web::get().to(regions))
        .route("/store/carts", web::post().to(create_cart))
        .route("/store/carts/{id}", web::get().to(get_cart))
        .route("/store/carts/{id}", web::post().to(update_cart))
        .route("/store/carts/{id}/line-items", web::post().to(add_line))
        .route("/store/carts/{id}/line-items/{line}", web::post().to(update_line))
        .route("/store/carts/{id}/line-items/{line}", web::delete().to(delete_line))
        .route("/store/carts/{id}/shipping-methods", web::post().to(add_shipping))
        .route("/store/carts/{id}/complete", web::post().to(complete))
        .route("/store/carts/{id}/customer", web::post().to(transfer))
        .route("/store/shipping-options", web::get().to(shipping_options))
        .route("/store/payment-collections", web::post().to(create_payment_collection))
        .route(
            "/store/payment-collections/{id}/payment-sessions",
            web::post().to(create_payment_session),
        )
        .route("/store/orders", web::get().to(list_orders))
        .route("/store/orders/{id}", web::get().to(get_order));
}

/// Start the mock on an ephemeral port. Returns its base URL and a handle for assertions.
pub async fn spawn_medusa() -> (String, web::Data<MockMedusa>) {
    let mock = web::Data::new(MockMedusa::seeded());
    let data = mock.clone();
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(mock_routes))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind mock Medusa");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    (format!("http://{addr}"), mock)
}

// ============================================================================
// APPLICATION SETUP
// ============================================================================

pub fn test_config(medusa_url: &str) -> Config {
    Config {
        medusa_url: medusa_url.to_string(),
        publishable_key: PUBLISHABLE_KEY.to_string(),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

pub fn client(medusa_url: &str) -> MedusaClient {
    MedusaClient::from_config(&test_config(medusa_url)).expect("Failed to build Medusa client")
}

/// Application state against `medusa_url`, with a memory store and a clock the test controls.
pub fn app_state(medusa_url: &str) -> (web::Data<AppState>, Arc<ManualClock>) {
    let config = test_config(medusa_url);
    let medusa = MedusaClient::from_config(&config).expect("Failed to build Medusa client");
    let clock = Arc::new(ManualClock::new(START_MS));
    let state = AppState::with_clock(config, medusa, ClientStore::memory(), clock.clone());
    (web::Data::new(state), clock)
}

pub fn session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[7u8; 64][..]))
        .cookie_secure(false)
        .build()
}

/// Build the storefront service exactly as `main` wires it (minus access logs and static files).
#[macro_export]
macro_rules! storefront {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::from_fn(
                    sklep::auth::middleware::ensure_profile,
                ))
                .wrap(common::session_middleware())
                .app_data($state.clone())
                .configure(sklep::app::configure)
                .default_service(actix_web::web::to(sklep::errors::not_found)),
        )
        .await
    };
}

// ============================================================================
// BROWSER SIMULATION
// ============================================================================

/// Cookies set by the app, replayed on every following request.
#[derive(Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn store<B>(&mut self, resp: &ServiceResponse<B>) {
        for cookie in resp.response().cookies() {
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }

    fn apply(&self, mut req: TestRequest) -> TestRequest {
        for (name, value) in &self.cookies {
            req = req.cookie(Cookie::new(name.clone(), value.clone()));
        }
        req
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The browser profile the app assigned to this jar.
    pub fn profile(&self) -> ProfileId {
        self.get("sklep_profile")
            .and_then(ProfileId::parse)
            .expect("No profile cookie set yet")
    }

    /// Forget the browser-session cookie, like closing the browser.
    pub fn close_browser(&mut self) {
        self.cookies.remove("id");
    }
}

pub struct Page {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl Page {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("Response body is not JSON")
    }
}

pub async fn send<S, B>(app: &S, jar: &mut CookieJar, req: TestRequest) -> Page
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, jar.apply(req).to_request()).await;
    jar.store(&resp);
    let status = resp.status();
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = test::read_body(resp).await;
    Page {
        status,
        location,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

pub async fn get<S, B>(app: &S, jar: &mut CookieJar, path: &str) -> Page
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(app, jar, TestRequest::get().uri(path)).await
}

pub async fn post_form<S, B>(app: &S, jar: &mut CookieJar, path: &str, fields: &[(&str, &str)]) -> Page
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let body = serde_urlencoded::to_string(fields).expect("Failed to encode form");
    let req = TestRequest::post()
        .uri(path)
        .insert_header(ContentType::form_url_encoded())
        .set_payload(body);
    send(app, jar, req).await
}

/// Load `path` and scrape the CSRF token from the rendered form.
pub async fn csrf_token<S, B>(app: &S, jar: &mut CookieJar, path: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let page = get(app, jar, path).await;
    let re = Regex::new(r#"name="csrf_token" value="([0-9a-f]{64})""#).unwrap();
    re.captures(&page.body)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| panic!("No CSRF token on {path} (status {})", page.status))
}
