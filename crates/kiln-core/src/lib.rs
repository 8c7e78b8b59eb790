//! Shared configuration, errors and helpers for the Kiln frontend.

pub mod config;
pub mod constants;
pub mod error;
pub mod util;
