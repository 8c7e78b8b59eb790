//! Adapter from salvo's cookie session to the facade's session seam.

use kiln_service::session::SessionState;
use salvo::{
    Depot,
    session::{Session, SessionDepotExt},
};

pub struct DepotSession<'a> {
    depot: &'a mut Depot,
}

impl<'a> DepotSession<'a> {
    pub fn new(depot: &'a mut Depot) -> Self {
        Self { depot }
    }
}

impl SessionState for DepotSession<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.depot.session().and_then(|session| session.get::<String>(key))
    }

    fn set(&mut self, key: &str, value: String) {
        if self.depot.session().is_none() {
            self.depot.set_session(Session::new());
        }
        if let Some(session) = self.depot.session_mut()
            && let Err(e) = session.insert(key, value)
        {
            tracing::error!(error = %e, key, "Failed to store session value");
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(session) = self.depot.session_mut() {
            session.remove(key);
        }
    }
}
