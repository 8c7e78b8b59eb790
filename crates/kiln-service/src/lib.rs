//! Authentication and group-authority facade of the Kiln frontend.

pub mod auth;
pub mod error;
pub mod session;
