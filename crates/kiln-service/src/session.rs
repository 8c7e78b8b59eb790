//! Session seam between the facade and the web layer's session storage.
//!
//! The facade only defines which keys it reads and writes; persistence across
//! requests is the web layer's business.

use std::collections::HashMap;

/// Session marker holding the federated identity URL.
pub const OPENID_SESSION_KEY: &str = "openid";
/// Session marker holding the Kerberos-authenticated username.
pub const KRB5_SESSION_KEY: &str = "krb5_login";

/// String key/value access to the current request's session.
pub trait SessionState: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

impl SessionState for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        HashMap::remove(self, key);
    }
}
