//! Browser-session (cookie) state: the session-scoped auth token and flash messages.
//!
//! Durable per-profile state lives in [`crate::storage`]; the cookie session
//! only holds what should disappear when the browser closes.

use actix_session::Session;

use crate::state::ClientContext;
use crate::storage::{StateStore, StorageKey};

const SESSION_TOKEN: &str = "auth_token";
const FLASH: &str = "flash";

pub fn session_token(session: &Session) -> Option<String> {
    session.get::<String>(SESSION_TOKEN).unwrap_or(None)
}

pub fn set_session_token(session: &Session, token: &str) {
    if let Err(e) = session.insert(SESSION_TOKEN, token) {
        log::warn!("Could not store session token: {e}");
    }
}

pub fn clear_session_token(session: &Session) {
    session.remove(SESSION_TOKEN);
}

/// Session token first, then the remembered (durable) token.
pub async fn current_token<S: StateStore>(session: &Session, ctx: &ClientContext<'_, S>) -> Option<String> {
    match session_token(session) {
        Some(token) => Some(token),
        None => ctx.read(&StorageKey::AuthToken).await,
    }
}

pub fn set_flash(session: &Session, message: &str) {
    let _ = session.insert(FLASH, message);
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>(FLASH).unwrap_or(None);
    if flash.is_some() {
        session.remove(FLASH);
    }
    flash
}
