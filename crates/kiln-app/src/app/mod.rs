pub mod api;
pub mod web;

use std::sync::Arc;

use kiln_core::{config::Settings, constants::NEXT_PARAM};
use kiln_service::auth::UserAuth;
use salvo::{
    Request, Response, Router,
    http::{StatusCode, header},
    session::{CookieStore, SessionHandler},
    writing::Json,
};
use serde::Serialize;
use tracing::error;

use crate::{
    auth_handler::AuthHandler,
    config::ConfigHandler,
    error::{AppError, AppResult},
    middleware::auth::CurrentUserMiddleware,
};

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Renders `err` as `{"error": ...}` with its status code.
pub fn render_error(res: &mut Response, err: &AppError) {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, status = status.as_u16(), "Request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
    }
    res.status_code(status);
    res.render(Json(ErrorResponse {
        error: err.public_message(),
    }));
}

/// Answers with a `302 Found` to `location`.
pub fn redirect(res: &mut Response, location: &str) {
    res.status_code(StatusCode::FOUND);
    let added = res
        .add_header(header::LOCATION, location, true)
        .map(|_res| ());
    if let Err(e) = added {
        error!(error = %e, location, "Invalid redirect location");
        render_error(res, &AppError::HttpError(e));
    }
}

/// ## Summary
/// Returns the post-login destination: a local absolute path, `/` otherwise.
///
/// Examples:
/// - "/coprs/" -> "/coprs/"
/// - "https://evil.example/" -> "/"
/// - "//evil.example/" -> "/"
#[must_use]
pub fn safe_next(raw: Option<&str>) -> String {
    match raw {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next.to_string()
        }
        _ => "/".to_string(),
    }
}

/// The sanitized `next` query parameter of `req`.
#[must_use]
pub fn next_param(req: &Request) -> String {
    safe_next(req.query::<String>(NEXT_PARAM).as_deref())
}

/// ## Summary
/// Constructs the application router: depot handlers, cookie sessions, the
/// session user middleware and every route.
///
/// ## Errors
/// Returns an error if the session handler rejects the configured secret.
pub fn router(settings: Arc<Settings>, auth: Arc<UserAuth>) -> AppResult<Router> {
    let session_handler = SessionHandler::builder(
        CookieStore::new(),
        settings.server.session_secret.as_bytes(),
    )
    .build()?;

    Ok(Router::new()
        .hoop(ConfigHandler { settings })
        .hoop(AuthHandler { auth })
        .hoop(session_handler)
        .hoop(CurrentUserMiddleware)
        .push(web::routes())
        .push(api::routes()))
}
