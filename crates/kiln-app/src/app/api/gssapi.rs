use kiln_core::constants::{GSSAPI_LOGIN_COMPONENT, WEB_UI_COMPONENT};
use kiln_db::model::user::User;
use salvo::{Depot, Request, Response, Router, handler, writing::Json};

use super::UserView;
use crate::{
    app::{next_param, redirect, render_error},
    auth_handler::get_auth_from_depot,
    config::get_config_from_depot,
    error::AppResult,
    session::DepotSession,
};

/// Logs in the principal the fronting web server put into the configured header.
async fn gssapi_user(req: &Request, depot: &mut Depot) -> AppResult<User> {
    let config = get_config_from_depot(depot)?;
    let auth = get_auth_from_depot(depot)?;

    let remote_user = req
        .headers()
        .get(config.auth.remote_user_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    Ok(auth
        .complete_gssapi_login(remote_user.as_deref(), &mut DepotSession::new(depot))
        .await?)
}

/// ## Summary
/// GET /api_3/gssapi_login/ - log in with Kerberos and return the user
///
/// ## Errors
/// Answers 403 without usable credentials or for unknown federated users.
#[handler]
async fn gssapi_login(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match gssapi_user(req, depot).await {
        Ok(user) => res.render(Json(UserView::from(&user))),
        Err(e) => render_error(res, &e),
    }
}

/// ## Summary
/// GET /api_3/gssapi_login/web-ui/ - log in with Kerberos and go to `next`
#[handler]
async fn gssapi_login_web_ui(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let next = next_param(req);

    match gssapi_user(req, depot).await {
        Ok(_user) => redirect(res, &next),
        Err(e) => render_error(res, &e),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(GSSAPI_LOGIN_COMPONENT)
        .get(gssapi_login)
        .push(Router::with_path(WEB_UI_COMPONENT).get(gssapi_login_web_ui))
}
