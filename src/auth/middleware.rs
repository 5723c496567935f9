use std::future::{Ready, ready};

use actix_session::SessionExt;
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::MessageBody,
    cookie::{Cookie, SameSite, time::Duration},
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

use crate::app::AppState;
use crate::auth::session::session_token;
use crate::errors::AppError;
use crate::storage::{ProfileId, StateStore, StorageKey};

pub const PROFILE_COOKIE: &str = "sklep_profile";

/// Attach a browser profile to every request, issuing the long-lived
/// `sklep_profile` cookie on the first visit.
pub async fn ensure_profile(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let existing = req
        .cookie(PROFILE_COOKIE)
        .and_then(|c| ProfileId::parse(c.value()));
    let fresh = existing.is_none();
    let profile = existing.unwrap_or_else(ProfileId::generate);
    req.extensions_mut().insert(profile.clone());

    let secure = req
        .app_data::<web::Data<AppState>>()
        .is_some_and(|state| state.config.secure_cookies);

    let mut res = next.call(req).await?;
    if fresh {
        let cookie = Cookie::build(PROFILE_COOKIE, profile.to_string())
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::days(365))
            .finish();
        res.response_mut().add_cookie(&cookie)?;
    }
    Ok(res)
}

impl FromRequest for ProfileId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let profile = req.extensions().get::<ProfileId>().cloned().or_else(|| {
            req.cookie(PROFILE_COOKIE)
                .and_then(|c| ProfileId::parse(c.value()))
        });
        ready(profile.ok_or_else(|| AppError::Session("No browser profile on request".to_string()).into()))
    }
}

/// Middleware function that checks for a customer token, in the browser
/// session or remembered for the profile. Redirects to /login if none found.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let mut has_token = session_token(&req.get_session()).is_some();

    if !has_token {
        let profile = req.extensions().get::<ProfileId>().cloned();
        if let (Some(profile), Some(state)) = (profile, req.app_data::<web::Data<AppState>>()) {
            has_token = match state.store.get(&profile, &StorageKey::AuthToken).await {
                Ok(token) => token.is_some(),
                Err(e) => {
                    log::warn!("Could not read remembered token: {e}");
                    false
                }
            };
        }
    }

    if !has_token {
        let response = HttpResponse::SeeOther()
            .insert_header(("Location", "/login"))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
