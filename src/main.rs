use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use sklep::app::{self, AppState};
use sklep::auth;
use sklep::config::Config;
use sklep::errors;
use sklep::medusa::MedusaClient;
use sklep::storage::{ClientStore, PgStore, eviction};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    // Client-state store: Postgres when configured, otherwise process memory
    let store = match &config.database_url {
        Some(url) => match PgStore::connect(url).await {
            Ok(pg) => {
                log::info!("Client state stored in Postgres");
                eviction::spawn_eviction(pg.clone(), config.retention_days);
                ClientStore::Postgres(pg)
            }
            Err(e) => {
                log::error!("Could not open client-state database: {e}");
                return Err(std::io::Error::other(e.to_string()));
            }
        },
        None => {
            log::warn!("No DATABASE_URL set, client state kept in memory (lost on restart)");
            ClientStore::memory()
        }
    };

    let medusa = MedusaClient::from_config(&config)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    if let Err(e) = medusa.health().await {
        log::warn!("Medusa at {} is not reachable yet: {e}", medusa.base_url());
    }

    // Session encryption key, from SESSION_KEY for sessions that survive restarts
    let secret_key = match &config.session_key {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let bind_addr = config.bind_addr.clone();
    let secure_cookies = config.secure_cookies;
    let state = web::Data::new(AppState::new(config, medusa, store));

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(secure_cookies)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(middleware::from_fn(auth::middleware::ensure_profile))
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(actix_files::Files::new("/static", "./static"))
            .configure(app::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(errors::not_found))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
