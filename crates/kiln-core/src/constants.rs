/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api_3";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const GSSAPI_LOGIN_COMPONENT: &str = "gssapi_login";
pub const GSSAPI_LOGIN_ROUTE: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", GSSAPI_LOGIN_COMPONENT, "/");

pub const WEB_UI_COMPONENT: &str = "web-ui";
pub const GSSAPI_WEB_UI_LOGIN_ROUTE: &str =
    const_str::concat!(GSSAPI_LOGIN_ROUTE, WEB_UI_COMPONENT, "/");

pub const AUTH_CHECK_COMPONENT: &str = "auth-check";

pub const LOGIN_COMPONENT: &str = "login";
pub const LOGIN_ROUTE: &str = const_str::concat!("/", LOGIN_COMPONENT, "/");

pub const KRB5_LOGIN_COMPONENT: &str = "krb5_login";
pub const KRB5_LOGIN_ROUTE: &str = const_str::concat!("/", KRB5_LOGIN_COMPONENT, "/");

pub const OPENID_COMPONENT: &str = "openid";
pub const OPENID_CALLBACK_COMPONENT: &str = "callback";
pub const OPENID_CALLBACK_ROUTE: &str =
    const_str::concat!("/", OPENID_COMPONENT, "/", OPENID_CALLBACK_COMPONENT, "/");

pub const LOGOUT_COMPONENT: &str = "logout";
pub const LOGOUT_ROUTE: &str = const_str::concat!("/", LOGOUT_COMPONENT, "/");

/// Query parameter carrying the post-login destination.
pub const NEXT_PARAM: &str = "next";
