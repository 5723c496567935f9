use std::{env, fmt::Display, str::FromStr, time::Duration};

use crate::auth::rate_limit::{LimiterPolicies, RateLimitPolicy};

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub medusa_url: String,
    pub publishable_key: String,
    /// Region used for new carts. When unset the first region Medusa reports is used.
    pub region_id: Option<String>,
    pub payment_provider: String,
    pub request_timeout: Duration,
    pub database_url: Option<String>,
    pub session_key: Option<String>,
    pub secure_cookies: bool,
    pub retention_days: i64,
    pub limiter: LimiterPolicies,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            medusa_url: "http://localhost:9000".to_string(),
            publishable_key: String::new(),
            region_id: None,
            payment_provider: "pp_system_default".to_string(),
            request_timeout: Duration::from_secs(10),
            database_url: None,
            session_key: None,
            secure_cookies: false,
            retention_days: 30,
            limiter: LimiterPolicies::defaults(),
        }
    }
}

impl Config {
    /// Build the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let publishable_key = var("MEDUSA_PUBLISHABLE_KEY").unwrap_or_default();
        if publishable_key.is_empty() {
            log::warn!("MEDUSA_PUBLISHABLE_KEY not set, Store API calls will likely be rejected");
        }

        let mut limiter = defaults.limiter.clone();
        for key in ["login", "registration", "password_reset"] {
            let base = limiter.get(key).clone();
            limiter = limiter.with(key, policy_from_env(key, base));
        }

        Self {
            bind_addr: try_load("BIND_ADDR", defaults.bind_addr),
            medusa_url: try_load("MEDUSA_BACKEND_URL", defaults.medusa_url)
                .trim_end_matches('/')
                .to_string(),
            publishable_key,
            region_id: var("MEDUSA_REGION_ID"),
            payment_provider: try_load("MEDUSA_PAYMENT_PROVIDER", defaults.payment_provider),
            request_timeout: Duration::from_secs(try_load("MEDUSA_TIMEOUT_SECS", 10u64)),
            database_url: var("DATABASE_URL"),
            session_key: var("SESSION_KEY"),
            secure_cookies: try_load("SECURE_COOKIES", defaults.secure_cookies),
            retention_days: try_load("CLIENT_STATE_RETENTION_DAYS", defaults.retention_days),
            limiter,
        }
    }
}

fn policy_from_env(key: &str, base: RateLimitPolicy) -> RateLimitPolicy {
    let prefix = format!("RATE_LIMIT_{}", key.to_uppercase());
    RateLimitPolicy {
        max_attempts: try_load(&format!("{prefix}_MAX"), base.max_attempts),
        window: Duration::from_secs(try_load(
            &format!("{prefix}_WINDOW_SECS"),
            base.window.as_secs(),
        )),
        block_duration: Duration::from_secs(try_load(
            &format!("{prefix}_BLOCK_SECS"),
            base.block_duration.as_secs(),
        )),
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value '{raw}': {e}, using default");
            default
        }),
        None => default,
    }
}
