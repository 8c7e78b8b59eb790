//! HTTP frontend for Kiln authentication.

pub mod app;
pub mod auth_handler;
pub mod config;
pub mod error;
pub mod middleware;
pub mod session;
