// Template context structures for Askama templates, organized by page area.

use actix_session::Session;

use crate::app::AppState;
use crate::auth::{csrf, session};
use crate::storage::ProfileId;

/// Common context shared by all pages.
/// Templates access these as `ctx.csrf_token`, `ctx.logged_in`, etc.
pub struct PageContext {
    pub csrf_token: String,
    pub flash: Option<String>,
    pub logged_in: bool,
    pub current_path: String,
}

impl PageContext {
    pub async fn build(session: &Session, state: &AppState, profile: &ProfileId, current_path: &str) -> Self {
        let client = state.client(profile);
        let logged_in = session::current_token(session, &client).await.is_some();
        Self {
            csrf_token: csrf::get_or_create_token(session),
            flash: session::take_flash(session),
            logged_in,
            current_path: current_path.to_string(),
        }
    }

    /// Whether the nav link for `prefix` should be highlighted.
    pub fn is_active(&self, prefix: &str) -> bool {
        self.current_path.starts_with(prefix)
    }
}

mod account;
mod auth;
mod cart;
mod errors;
pub mod format;
mod shop;

pub use account::*;
pub use auth::*;
pub use cart::*;
pub use errors::*;
pub use shop::*;
