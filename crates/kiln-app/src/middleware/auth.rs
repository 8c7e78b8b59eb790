use salvo::Depot;
use tracing::error;

use crate::{app::render_error, auth_handler::get_auth_from_depot, session::DepotSession};
use kiln_db::depot_types::{CURRENT_USER_KEY, DepotUser};

/// ## Summary
/// Middleware that loads the logged-in user, if any.
pub struct CurrentUserMiddleware;

/// ## Summary
/// Resolves the session's login marker into a user and stores it in the depot.
/// Sessions without a marker, or whose marker names an unknown user, are
/// anonymous.
///
/// ## Side Effects
/// Inserts a [`DepotUser`] under [`CURRENT_USER_KEY`] for downstream handlers.
///
/// ## Errors
/// Answers with an error response if the user store fails.
#[salvo::async_trait]
impl salvo::Handler for CurrentUserMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let auth = match get_auth_from_depot(depot) {
            Ok(auth) => auth,
            Err(e) => {
                error!(error = ?e, "Failed to get auth facade from depot");
                render_error(res, &e);
                ctrl.skip_rest();
                return;
            }
        };

        let current = auth.current_user(&DepotSession::new(depot)).await;

        match current {
            Ok(Some(user)) => {
                tracing::trace!(user = %user.name, "Session user resolved");
                depot.insert(CURRENT_USER_KEY, DepotUser::User(user));
            }
            Ok(None) => {
                depot.insert(CURRENT_USER_KEY, DepotUser::Anonymous);
            }
            Err(e) => {
                error!(error = ?e, "Failed to resolve session user");
                render_error(res, &e.into());
                ctrl.skip_rest();
            }
        }
    }
}
