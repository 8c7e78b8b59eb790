//! Request-scoped types shared between the service and HTTP crates.
use crate::model::user::User;

/// Depot key of the request's [`DepotUser`].
pub const CURRENT_USER_KEY: &str = "current_user";

/// Represents a logged-in user or anonymous access in the depot.
#[derive(Debug, Clone)]
pub enum DepotUser {
    /// Logged-in user
    User(User),
    /// No session marker, or the marker points at an unknown user
    Anonymous,
}

impl DepotUser {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }
}
