use std::collections::HashMap;

use kiln_db::model::user::User;
use kiln_service::auth::{MechanismKind, UserAuth};
use salvo::{Depot, Request, Response, handler};
use url::form_urlencoded;

use crate::{
    app::{next_param, redirect, render_error},
    auth_handler::get_auth_from_depot,
    error::AppResult,
    session::DepotSession,
};

async fn start_login(kind: MechanismKind, next: &str, depot: &mut Depot, res: &mut Response) {
    let auth = match get_auth_from_depot(depot) {
        Ok(auth) => auth,
        Err(e) => {
            render_error(res, &e);
            return;
        }
    };

    match auth.login(kind, &DepotSession::new(depot), next).await {
        Ok(location) => {
            tracing::debug!(mechanism = %kind, location = %location, "Starting login");
            redirect(res, &location);
        }
        Err(e) => render_error(res, &e.into()),
    }
}

/// ## Summary
/// GET /login/ - redirect to the OpenID provider
#[handler]
pub async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    start_login(MechanismKind::Federated, &next_param(req), depot, res).await;
}

/// ## Summary
/// GET /krb5_login/ - redirect to the GSSAPI-protected login route
#[handler]
pub async fn krb5_login(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    start_login(MechanismKind::Directory, &next_param(req), depot, res).await;
}

async fn finish_openid_login(
    auth: &UserAuth,
    params: &HashMap<String, String>,
    depot: &mut Depot,
) -> AppResult<User> {
    let resp = auth.verify_openid(params).await?;
    Ok(auth
        .complete_openid_login(&resp, &mut DepotSession::new(depot))
        .await?)
}

/// ## Summary
/// GET /openid/callback/ - verify the provider's assertion and log the user in
///
/// ## Errors
/// Answers 400 if the user cancelled, 403 if the user is not allowed and 502
/// if the provider does not confirm the assertion.
#[handler]
pub async fn openid_callback(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let next = next_param(req);
    let params: HashMap<String, String> = req
        .uri()
        .query()
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let auth = match get_auth_from_depot(depot) {
        Ok(auth) => auth,
        Err(e) => {
            render_error(res, &e);
            return;
        }
    };

    match finish_openid_login(&auth, &params, depot).await {
        Ok(_user) => redirect(res, &next),
        Err(e) => render_error(res, &e),
    }
}
