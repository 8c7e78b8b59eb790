use salvo::{Depot, Request, Response, handler};

use crate::{
    app::{next_param, redirect, render_error},
    auth_handler::get_auth_from_depot,
    session::DepotSession,
};

/// ## Summary
/// GET /logout/ - clear the session's login markers and go to `next`
#[handler]
pub async fn logout(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let next = next_param(req);

    match get_auth_from_depot(depot) {
        Ok(auth) => {
            auth.logout(&mut DepotSession::new(depot));
            redirect(res, &next);
        }
        Err(e) => render_error(res, &e),
    }
}
