//! Durable per-profile client state.
//!
//! Everything a browser would otherwise keep in local storage (auth token,
//! remembered e-mail, cart id, rate-limit ledgers) goes through [`StateStore`],
//! keyed by the browser profile and a typed [`StorageKey`]. The medium is
//! swappable: [`MemoryStore`] for tests and single-process setups,
//! [`PgStore`] for anything that must survive a restart.

pub mod eviction;
pub mod memory;
pub mod postgres;

use std::fmt;
use std::future::Future;

use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Opaque identifier of one browser profile (32 lowercase hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        ProfileId(hex::encode(bytes))
    }

    /// Accept only well-formed ids so a tampered cookie cannot address arbitrary rows.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == 32
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| ProfileId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical keys of the client-state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AuthToken,
    AuthRemember,
    CartId,
    RememberedEmail,
    /// Attempt ledger of one rate-limited action.
    RateLimit(String),
    /// Block marker of one rate-limited action.
    RateLimitBlock(String),
}

impl StorageKey {
    pub fn name(&self) -> String {
        match self {
            StorageKey::AuthToken => "auth_token".to_string(),
            StorageKey::AuthRemember => "auth_remember".to_string(),
            StorageKey::CartId => "cart_id".to_string(),
            StorageKey::RememberedEmail => "remembered_email".to_string(),
            StorageKey::RateLimit(action) => format!("rate_limit_{action}"),
            StorageKey::RateLimitBlock(action) => format!("rate_limit_{action}_block"),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug)]
pub enum StorageError {
    Db(sqlx::Error),
    Migrate(sqlx::migrate::MigrateError),
    Json(serde_json::Error),
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Db(e) => write!(f, "Database error: {e}"),
            StorageError::Migrate(e) => write!(f, "Migration error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::Unavailable(e) => write!(f, "Storage unavailable: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Db(e)
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StorageError::Migrate(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// A storage medium for client state. Values are opaque strings.
pub trait StateStore: Send + Sync {
    fn get(
        &self,
        profile: &ProfileId,
        key: &StorageKey,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    fn set(
        &self,
        profile: &ProfileId,
        key: &StorageKey,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn remove(
        &self,
        profile: &ProfileId,
        key: &StorageKey,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Read a JSON-encoded value.
pub async fn load_json<S: StateStore, T: DeserializeOwned>(
    store: &S,
    profile: &ProfileId,
    key: &StorageKey,
) -> Result<Option<T>, StorageError> {
    match store.get(profile, key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Write a value as JSON.
pub async fn save_json<S: StateStore, T: Serialize>(
    store: &S,
    profile: &ProfileId,
    key: &StorageKey,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(profile, key, &raw).await
}

/// The store wired into the running application.
#[derive(Clone)]
pub enum ClientStore {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl ClientStore {
    pub fn memory() -> Self {
        ClientStore::Memory(MemoryStore::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            ClientStore::Memory(_) => "memory",
            ClientStore::Postgres(_) => "postgres",
        }
    }
}

impl StateStore for ClientStore {
    async fn get(&self, profile: &ProfileId, key: &StorageKey) -> Result<Option<String>, StorageError> {
        match self {
            ClientStore::Memory(s) => s.get(profile, key).await,
            ClientStore::Postgres(s) => s.get(profile, key).await,
        }
    }

    async fn set(&self, profile: &ProfileId, key: &StorageKey, value: &str) -> Result<(), StorageError> {
        match self {
            ClientStore::Memory(s) => s.set(profile, key, value).await,
            ClientStore::Postgres(s) => s.set(profile, key, value).await,
        }
    }

    async fn remove(&self, profile: &ProfileId, key: &StorageKey) -> Result<(), StorageError> {
        match self {
            ClientStore::Memory(s) => s.remove(profile, key).await,
            ClientStore::Postgres(s) => s.remove(profile, key).await,
        }
    }
}
