//! Browser-facing login and logout endpoints.

mod login;
mod logout;

use kiln_core::constants::{
    KRB5_LOGIN_COMPONENT, LOGIN_COMPONENT, LOGOUT_COMPONENT, OPENID_CALLBACK_COMPONENT,
    OPENID_COMPONENT,
};
use salvo::Router;

#[must_use]
pub fn routes() -> Router {
    Router::new()
        .push(Router::with_path(LOGIN_COMPONENT).get(login::login))
        .push(Router::with_path(KRB5_LOGIN_COMPONENT).get(login::krb5_login))
        .push(
            Router::with_path(OPENID_COMPONENT)
                .push(Router::with_path(OPENID_CALLBACK_COMPONENT).get(login::openid_callback)),
        )
        .push(Router::with_path(LOGOUT_COMPONENT).get(logout::logout))
}
