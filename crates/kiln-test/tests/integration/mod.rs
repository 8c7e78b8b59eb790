#![allow(clippy::unused_async)]
//! Integration tests for the authentication HTTP surface.
//!
//! Every test builds its own service, so tests share no users or sessions.

mod api_root;
mod auth_check;
mod helpers;
mod logout;
mod openid_login;
