mod auth_check;
mod gssapi;

use kiln_db::model::user::User;
use salvo::{Router, handler, writing::Json};
use serde::Serialize;
use serde_json::json;

pub use kiln_core::constants::{API_ROUTE_COMPONENT, API_ROUTE_PREFIX};

/// Version reported by the API root.
pub const API_VERSION: u32 = 3;

/// ## Summary
/// User payload of the API login and auth-check endpoints
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub mail: String,
    pub timezone: Option<String>,
    pub admin: bool,
    pub groups: Option<Vec<String>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            mail: user.mail.clone(),
            timezone: user.timezone.clone(),
            admin: user.admin,
            groups: user
                .openid_groups
                .as_ref()
                .and_then(|groups| groups.names.clone()),
        }
    }
}

#[handler]
async fn api_root() -> Json<serde_json::Value> {
    Json(json!({ "version": API_VERSION }))
}

/// ## Summary
/// Constructs the API router.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .get(api_root)
        .push(gssapi::routes())
        .push(auth_check::routes())
}
