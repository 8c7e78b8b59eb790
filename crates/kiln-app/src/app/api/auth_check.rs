use kiln_core::constants::AUTH_CHECK_COMPONENT;
use kiln_db::depot_types::{CURRENT_USER_KEY, DepotUser};
use kiln_service::error::ServiceError;
use salvo::{Depot, Response, Router, handler, writing::Json};

use super::UserView;
use crate::app::render_error;

/// ## Summary
/// GET /api_3/auth-check - returns the logged-in user.
/// The user is retrieved from the depot set by the `CurrentUserMiddleware`.
///
/// ## Errors
/// Answers 401 for anonymous sessions.
#[handler]
async fn auth_check(depot: &Depot, res: &mut Response) {
    match depot.get::<DepotUser>(CURRENT_USER_KEY) {
        Ok(DepotUser::User(user)) => res.render(Json(UserView::from(user))),
        Ok(DepotUser::Anonymous) => render_error(res, &ServiceError::NotAuthenticated.into()),
        Err(_) => {
            tracing::error!("Current user not found in depot");
            render_error(
                res,
                &kiln_core::error::CoreError::InvariantViolation("Current user not found in depot")
                    .into(),
            );
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(AUTH_CHECK_COMPONENT).get(auth_check)
}
