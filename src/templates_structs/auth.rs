use askama::Template;

use super::{PageContext, format};
use crate::auth::rate_limit::RateLimitStatus;

/// Rate-limit state as shown next to a throttled form.
pub struct LimitView {
    pub key: String,
    pub blocked: bool,
    pub time_remaining: u64,
    pub countdown: String,
    pub attempts: usize,
}

impl LimitView {
    pub fn new(key: &str, status: &RateLimitStatus) -> Self {
        Self {
            key: key.to_string(),
            blocked: status.is_blocked,
            time_remaining: status.time_remaining,
            countdown: format::countdown(status.time_remaining),
            attempts: status.attempts,
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
    pub email: String,
    pub remember: bool,
    pub limit: LimitView,
}

/// Values echoed back into the registration form after a failed submit.
#[derive(Default)]
pub struct RegisterValues {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
    pub form: RegisterValues,
    pub limit: LimitView,
}

#[derive(Template)]
#[template(path = "forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
    pub email: String,
    pub sent: bool,
    pub limit: LimitView,
}

#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
    pub token: String,
    pub email: String,
}
