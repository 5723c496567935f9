//! Client-side mirrors of Medusa state (auth, cart).
//!
//! Each mirror is a plain state value, an action enum and a pure `reduce`
//! function. The session types around them talk to Medusa and the client
//! store, and always re-fetch after a write; local state is never the source
//! of truth for prices or totals.

pub mod auth;
pub mod cart;

use crate::medusa::MedusaClient;
use crate::storage::{ClientStore, ProfileId, StateStore, StorageKey};

pub use auth::{AuthAction, AuthSession, AuthState, AuthStatus, LoginOutcome, Registration};
pub use cart::{CartAction, CartSession, CartState};

/// Everything a state session needs to reach Medusa and the profile's stored state.
pub struct ClientContext<'a, S: StateStore = ClientStore> {
    pub medusa: &'a MedusaClient,
    pub store: &'a S,
    pub profile: &'a ProfileId,
}

impl<S: StateStore> Clone for ClientContext<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: StateStore> Copy for ClientContext<'_, S> {}

impl<'a, S: StateStore> ClientContext<'a, S> {
    pub fn new(medusa: &'a MedusaClient, store: &'a S, profile: &'a ProfileId) -> Self {
        Self {
            medusa,
            store,
            profile,
        }
    }

    /// Best-effort read: a failing store reads as empty.
    pub async fn read(&self, key: &StorageKey) -> Option<String> {
        match self.store.get(self.profile, key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Client state: could not read {key}: {e}");
                None
            }
        }
    }

    /// Best-effort write.
    pub async fn write(&self, key: &StorageKey, value: &str) {
        if let Err(e) = self.store.set(self.profile, key, value).await {
            log::warn!("Client state: could not write {key}: {e}");
        }
    }

    /// Best-effort delete.
    pub async fn clear(&self, key: &StorageKey) {
        if let Err(e) = self.store.remove(self.profile, key).await {
            log::warn!("Client state: could not clear {key}: {e}");
        }
    }
}
