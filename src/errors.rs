use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use askama::Template;
use std::fmt;

use crate::medusa::ApiError;
use crate::storage::StorageError;
use crate::templates_structs::UpstreamErrorTemplate;

#[derive(Debug)]
pub enum AppError {
    Template(askama::Error),
    Storage(StorageError),
    Api(ApiError),
    Session(String),
    Csrf,
    NotFound,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Template(e) => write!(f, "Template error: {e}"),
            AppError::Storage(e) => write!(f, "Storage error: {e}"),
            AppError::Api(e) => write!(f, "Medusa error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Csrf => write!(f, "Invalid or missing CSRF token"),
            AppError::NotFound => write!(f, "Not found"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Csrf => StatusCode::FORBIDDEN,
            AppError::Api(e) if e.is_unauthorized() => StatusCode::SEE_OTHER,
            AppError::Api(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Api(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => not_found_page(),
            AppError::Csrf => HttpResponse::Forbidden().body("Invalid or missing CSRF token"),
            // An expired customer token sends the shopper back to the login form.
            AppError::Api(e) if e.is_unauthorized() => HttpResponse::SeeOther()
                .insert_header(("Location", "/login"))
                .finish(),
            AppError::Api(e) if e.is_not_found() => not_found_page(),
            AppError::Api(e) => {
                log::error!("{self}");
                let page = UpstreamErrorTemplate {
                    message: e.message.clone(),
                };
                render_with_status(page, StatusCode::BAD_GATEWAY).unwrap_or_else(|err| {
                    log::error!("Failed to render upstream error page: {err}");
                    HttpResponse::BadGateway().body("Bad Gateway")
                })
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError().body("Internal Server Error")
            }
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e)
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        AppError::Api(e)
    }
}

/// Render an askama template into a 200 HTML response.
pub fn render(tmpl: impl Template) -> Result<HttpResponse, AppError> {
    render_with_status(tmpl, StatusCode::OK)
}

pub fn render_with_status(tmpl: impl Template, status: StatusCode) -> Result<HttpResponse, AppError> {
    let body = tmpl.render()?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// 303 redirect, used after every successful form POST.
pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location))
        .finish()
}

/// Fallback for unmatched routes.
pub async fn not_found() -> HttpResponse {
    not_found_page()
}

fn not_found_page() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../templates/errors/404.html"))
}
