use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] kiln_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] kiln_core::error::CoreError),

    #[error("No auth method available")]
    NoAuthMethod,

    #[error("Nowhere to get user groups from")]
    NoGroupSource,

    #[error("{0}")]
    AccessRestricted(String),

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("{0}")]
    DirectoryError(String),

    #[error("{0}")]
    InvalidUsername(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Login cancelled by the identity provider")]
    LoginCancelled,

    #[error("OpenID error: {0}")]
    OpenIdError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

impl ServiceError {
    /// HTTP status code the web layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::AccessRestricted(_) | Self::InvalidUsername(_) => 403,
            Self::NotAuthenticated => 401,
            Self::LoginCancelled | Self::ValidationError(_) => 400,
            Self::NotFound(_) => 404,
            Self::DirectoryUnavailable(_) => 503,
            Self::DirectoryError(_) | Self::OpenIdError(_) | Self::HttpError(_) => 502,
            Self::DatabaseError(_)
            | Self::CoreError(_)
            | Self::NoAuthMethod
            | Self::NoGroupSource
            | Self::InvalidConfiguration(_)
            | Self::InvariantViolation(_) => 500,
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
