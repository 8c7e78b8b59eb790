use std::sync::Arc;

use kiln_core::error::CoreError;
use kiln_service::auth::UserAuth;
use salvo::async_trait;

use crate::error::AppResult;

/// Makes the auth facade available to downstream handlers.
pub struct AuthHandler {
    pub auth: Arc<UserAuth>,
}

#[async_trait]
impl salvo::Handler for AuthHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.auth.clone());
    }
}

/// ## Summary
/// Retrieves the auth facade from the depot.
///
/// ## Errors
/// Returns an error if the facade is not found in the depot.
pub fn get_auth_from_depot(depot: &salvo::Depot) -> AppResult<Arc<UserAuth>> {
    depot
        .obtain::<Arc<UserAuth>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Auth facade not found in depot").into())
}
