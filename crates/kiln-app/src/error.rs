use salvo::http::StatusCode;
use thiserror::Error;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] kiln_service::error::ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] kiln_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] kiln_core::error::CoreError),

    #[error(transparent)]
    HttpError(#[from] salvo::Error),
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::DatabaseError(_) | Self::CoreError(_) | Self::HttpError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Internal failures are not described.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() && !self.is_reportable() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    fn is_reportable(&self) -> bool {
        use kiln_service::error::ServiceError;

        matches!(
            self,
            Self::ServiceError(
                ServiceError::DirectoryUnavailable(_)
                    | ServiceError::DirectoryError(_)
                    | ServiceError::OpenIdError(_)
                    | ServiceError::NoAuthMethod
            )
        )
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
