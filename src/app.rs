use std::sync::Arc;

use actix_web::{HttpResponse, middleware, web};

use crate::auth::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::auth;
use crate::config::Config;
use crate::handlers;
use crate::medusa::MedusaClient;
use crate::state::ClientContext;
use crate::storage::{ClientStore, ProfileId};

/// Shared application state, handed to handlers as `web::Data<AppState>`.
pub struct AppState {
    pub config: Config,
    pub medusa: MedusaClient,
    pub store: ClientStore,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, medusa: MedusaClient, store: ClientStore) -> Self {
        Self::with_clock(config, medusa, store, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, medusa: MedusaClient, store: ClientStore, clock: Arc<dyn Clock>) -> Self {
        let limiter = RateLimiter::with_clock(store.clone(), config.limiter.clone(), clock);
        Self {
            config,
            medusa,
            store,
            limiter,
        }
    }

    pub fn client<'a>(&'a self, profile: &'a ProfileId) -> ClientContext<'a> {
        ClientContext::new(&self.medusa, &self.store, profile)
    }
}

/// Register every route. Paths with fixed segments go before their `{param}` siblings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Root redirect
        .route("/", web::get().to(|| async {
            HttpResponse::SeeOther()
                .insert_header(("Location", "/sklep"))
                .finish()
        }))
        // Auth
        .route("/login", web::get().to(handlers::auth_handlers::login_page))
        .route("/login", web::post().to(handlers::auth_handlers::login_submit))
        .route("/register", web::get().to(handlers::auth_handlers::register_page))
        .route("/register", web::post().to(handlers::auth_handlers::register_submit))
        .route("/forgot-password", web::get().to(handlers::auth_handlers::forgot_password_page))
        .route("/forgot-password", web::post().to(handlers::auth_handlers::forgot_password_submit))
        .route("/reset-password", web::get().to(handlers::auth_handlers::reset_password_page))
        .route("/reset-password", web::post().to(handlers::auth_handlers::reset_password_submit))
        .route("/logout", web::post().to(handlers::auth_handlers::logout))
        // Shop
        .route("/sklep", web::get().to(handlers::shop_handlers::index))
        .route("/sklep/{handle}", web::get().to(handlers::shop_handlers::product))
        // Cart: /koszyk/dodaj BEFORE /koszyk/{line_id}
        .route("/koszyk", web::get().to(handlers::cart_handlers::page))
        .route("/koszyk/dodaj", web::post().to(handlers::cart_handlers::add))
        .route("/koszyk/{line_id}", web::post().to(handlers::cart_handlers::update))
        .route("/koszyk/{line_id}/usun", web::post().to(handlers::cart_handlers::remove))
        // Checkout
        .route("/checkout", web::get().to(handlers::checkout_handlers::page))
        .route("/checkout/adres", web::post().to(handlers::checkout_handlers::address))
        .route("/checkout/dostawa", web::post().to(handlers::checkout_handlers::shipping))
        .route("/checkout/zamow", web::post().to(handlers::checkout_handlers::place_order))
        .route("/checkout/potwierdzenie/{id}", web::get().to(handlers::checkout_handlers::confirmation))
        // JSON
        .route("/api/cart", web::get().to(handlers::cart_handlers::summary))
        .route("/api/limit/{key}", web::get().to(handlers::store_api::limit_status))
        .route("/api/health", web::get().to(handlers::store_api::health))
        .route("/store/inventory", web::get().to(handlers::store_api::inventory))
        .route("/store/prices", web::get().to(handlers::store_api::prices))
        // Live block countdown
        .route("/ws/limit/{key}", web::get().to(handlers::limit_ws::connect))
        // Account (protected)
        .service(
            web::scope("/konto")
                .wrap(middleware::from_fn(auth::middleware::require_auth))
                .route("", web::get().to(handlers::account_handlers::page))
                .route("", web::post().to(handlers::account_handlers::update))
                .route("/zamowienia/{id}", web::get().to(handlers::account_handlers::order)),
        );
}
