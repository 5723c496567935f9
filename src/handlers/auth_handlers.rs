use actix_session::Session;
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::rate_limit::RateLimitStatus;
use crate::auth::{csrf, session, validate};
use crate::errors::{AppError, render, render_with_status, see_other};
use crate::medusa::ApiError;
use crate::state::{AuthSession, CartSession, Registration};
use crate::storage::ProfileId;
use crate::templates_structs::{
    ForgotPasswordTemplate, LimitView, LoginTemplate, PageContext, RegisterTemplate, RegisterValues,
    ResetPasswordTemplate, format,
};

const LOGIN: &str = "login";
const REGISTRATION: &str = "registration";
const PASSWORD_RESET: &str = "password_reset";

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: Option<String>,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct ResetQuery {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

fn blocked_message(status: &RateLimitStatus) -> String {
    format!(
        "Zbyt wiele prób. Spróbuj ponownie za {}.",
        format::countdown(status.time_remaining)
    )
}

/// A rejected submit while blocked answers 429; re-rendering the form otherwise stays 200.
fn form_status(status: &RateLimitStatus, errors: &[String]) -> StatusCode {
    if status.is_blocked && !errors.is_empty() {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::OK
    }
}

fn credentials_message(e: &ApiError) -> String {
    match e.status {
        Some(400) | Some(401) => "Nieprawidłowy e-mail lub hasło".to_string(),
        _ => e.message.clone(),
    }
}

async fn login_form(
    state: &AppState,
    session: &Session,
    profile: &ProfileId,
    errors: Vec<String>,
    email: &str,
    remember: bool,
) -> Result<HttpResponse, AppError> {
    let status = state.limiter.check_status(profile, LOGIN).await;
    let code = form_status(&status, &errors);
    let ctx = PageContext::build(session, state, profile, "/login").await;
    let tmpl = LoginTemplate {
        ctx,
        errors,
        email: email.to_string(),
        remember,
        limit: LimitView::new(LOGIN, &status),
    };
    render_with_status(tmpl, code)
}

pub async fn login_page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
) -> Result<HttpResponse, AppError> {
    let client = state.client(&profile);
    // If already logged in, go straight to the account page
    if session::current_token(&session, &client).await.is_some() {
        return Ok(see_other("/konto"));
    }

    let auth = AuthSession::new(client);
    let email = auth.remembered_email().await.unwrap_or_default();
    let remember = auth.remember_flag().await;
    login_form(&state, &session, &profile, vec![], &email, remember).await
}

pub async fn login_submit(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let remember = form.remember.is_some();
    let email = form.email.trim();

    // Rate-limit check BEFORE contacting Medusa
    let status = state.limiter.check_status(&profile, LOGIN).await;
    if !status.can_submit {
        let errors = vec![blocked_message(&status)];
        return login_form(&state, &session, &profile, errors, email, remember).await;
    }

    let mut errors: Vec<String> = vec![];
    errors.extend(validate::validate_email(email));
    if form.password.is_empty() {
        errors.push("Hasło jest wymagane".to_string());
    }
    if !errors.is_empty() {
        return login_form(&state, &session, &profile, errors, email, remember).await;
    }

    let client = state.client(&profile);
    let mut auth = AuthSession::new(client);
    match auth.login(email, &form.password, remember).await {
        Ok(outcome) => {
            state.limiter.reset(&profile, LOGIN).await;
            if !outcome.remembered {
                session::set_session_token(&session, &outcome.token);
            }

            let mut cart = CartSession::new(client, state.config.region_id.clone());
            if let Err(e) = cart.attach_customer(&outcome.token).await {
                log::warn!("Could not attach cart to customer: {e}");
            }

            session::set_flash(&session, "Zalogowano pomyślnie");
            Ok(see_other("/konto"))
        }
        Err(e) => {
            // Only a rejection by Medusa counts; an unreachable or failing backend is not the shopper's attempt.
            if e.status.is_some_and(|s| s < 500) {
                state.limiter.record_attempt(&profile, LOGIN).await;
            }
            let errors = vec![credentials_message(&e)];
            login_form(&state, &session, &profile, errors, email, remember).await
        }
    }
}

async fn register_form(
    state: &AppState,
    session: &Session,
    profile: &ProfileId,
    errors: Vec<String>,
    form: RegisterValues,
) -> Result<HttpResponse, AppError> {
    let status = state.limiter.check_status(profile, REGISTRATION).await;
    let code = form_status(&status, &errors);
    let ctx = PageContext::build(session, state, profile, "/register").await;
    let tmpl = RegisterTemplate {
        ctx,
        errors,
        form,
        limit: LimitView::new(REGISTRATION, &status),
    };
    render_with_status(tmpl, code)
}

pub async fn register_page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
) -> Result<HttpResponse, AppError> {
    register_form(&state, &session, &profile, vec![], RegisterValues::default()).await
}

pub async fn register_submit(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let form = form.into_inner();
    let values = RegisterValues {
        email: form.email.trim().to_string(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
    };

    let status = state.limiter.check_status(&profile, REGISTRATION).await;
    if !status.can_submit {
        let errors = vec![blocked_message(&status)];
        return register_form(&state, &session, &profile, errors, values).await;
    }

    let mut errors: Vec<String> = vec![];
    errors.extend(validate::validate_email(&values.email));
    errors.extend(validate::validate_password(&form.password));
    errors.extend(validate::validate_password_confirmation(
        &form.password,
        &form.password_confirmation,
    ));
    errors.extend(validate::validate_required(&values.first_name, "Imię", 100));
    errors.extend(validate::validate_required(&values.last_name, "Nazwisko", 100));
    errors.extend(validate::validate_phone(&values.phone));
    if !errors.is_empty() {
        return register_form(&state, &session, &profile, errors, values).await;
    }

    let registration = Registration {
        email: values.email.clone(),
        password: form.password,
        first_name: values.first_name.clone(),
        last_name: values.last_name.clone(),
        phone: (!values.phone.is_empty()).then(|| values.phone.clone()),
    };

    let client = state.client(&profile);
    let mut auth = AuthSession::new(client);
    match auth.register(&registration).await {
        Ok(outcome) => {
            state.limiter.reset(&profile, REGISTRATION).await;
            session::set_session_token(&session, &outcome.token);

            let mut cart = CartSession::new(client, state.config.region_id.clone());
            if let Err(e) = cart.attach_customer(&outcome.token).await {
                log::warn!("Could not attach cart to new customer: {e}");
            }

            session::set_flash(&session, "Konto zostało utworzone");
            Ok(see_other("/konto"))
        }
        Err(e) => {
            if e.status.is_some_and(|s| s < 500) {
                state.limiter.record_attempt(&profile, REGISTRATION).await;
            }
            register_form(&state, &session, &profile, vec![e.message], values).await
        }
    }
}

async fn forgot_form(
    state: &AppState,
    session: &Session,
    profile: &ProfileId,
    errors: Vec<String>,
    email: &str,
    sent: bool,
) -> Result<HttpResponse, AppError> {
    let status = state.limiter.check_status(profile, PASSWORD_RESET).await;
    let code = form_status(&status, &errors);
    let ctx = PageContext::build(session, state, profile, "/forgot-password").await;
    let tmpl = ForgotPasswordTemplate {
        ctx,
        errors,
        email: email.to_string(),
        sent,
        limit: LimitView::new(PASSWORD_RESET, &status),
    };
    render_with_status(tmpl, code)
}

pub async fn forgot_password_page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
) -> Result<HttpResponse, AppError> {
    forgot_form(&state, &session, &profile, vec![], "", false).await
}

/// Every reset request counts toward the limit, successful or not.
pub async fn forgot_password_submit(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<ForgotPasswordForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let email = form.email.trim();

    let status = state.limiter.check_status(&profile, PASSWORD_RESET).await;
    if !status.can_submit {
        let errors = vec![blocked_message(&status)];
        return forgot_form(&state, &session, &profile, errors, email, false).await;
    }

    if let Some(error) = validate::validate_email(email) {
        return forgot_form(&state, &session, &profile, vec![error], email, false).await;
    }

    state.limiter.record_attempt(&profile, PASSWORD_RESET).await;
    match state.medusa.request_password_reset(email).await {
        // Unknown addresses look the same as known ones.
        Ok(()) => forgot_form(&state, &session, &profile, vec![], email, true).await,
        Err(e) if e.status.is_some_and(|s| s < 500) => {
            log::info!("Password reset request rejected: {e}");
            forgot_form(&state, &session, &profile, vec![], email, true).await
        }
        Err(e) => forgot_form(&state, &session, &profile, vec![e.message], email, false).await,
    }
}

pub async fn reset_password_page(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    query: web::Query<ResetQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let mut errors = vec![];
    if query.token.is_empty() {
        errors.push("Link do zmiany hasła jest nieprawidłowy lub wygasł".to_string());
    }
    let ctx = PageContext::build(&session, &state, &profile, "/reset-password").await;
    render(ResetPasswordTemplate {
        ctx,
        errors,
        token: query.token,
        email: query.email,
    })
}

pub async fn reset_password_submit(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<ResetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let form = form.into_inner();

    let mut errors: Vec<String> = vec![];
    if form.token.is_empty() {
        errors.push("Link do zmiany hasła jest nieprawidłowy lub wygasł".to_string());
    }
    errors.extend(validate::validate_email(&form.email));
    errors.extend(validate::validate_password(&form.password));
    errors.extend(validate::validate_password_confirmation(
        &form.password,
        &form.password_confirmation,
    ));

    if errors.is_empty() {
        match state
            .medusa
            .update_password(&form.token, form.email.trim(), &form.password)
            .await
        {
            Ok(()) => {
                session::set_flash(&session, "Hasło zostało zmienione. Zaloguj się nowym hasłem.");
                return Ok(see_other("/login"));
            }
            Err(e) if e.is_unauthorized() => {
                errors.push("Link do zmiany hasła jest nieprawidłowy lub wygasł".to_string());
            }
            Err(e) => errors.push(e.message),
        }
    }

    let ctx = PageContext::build(&session, &state, &profile, "/reset-password").await;
    render(ResetPasswordTemplate {
        ctx,
        errors,
        token: form.token,
        email: form.email,
    })
}

pub async fn logout(
    state: web::Data<AppState>,
    session: Session,
    profile: ProfileId,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let mut auth = AuthSession::new(state.client(&profile));
    auth.logout().await;
    session::clear_session_token(&session);
    session.renew();
    session::set_flash(&session, "Wylogowano");
    Ok(see_other("/login"))
}
