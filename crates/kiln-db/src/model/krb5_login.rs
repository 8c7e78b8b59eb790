use serde::{Deserialize, Serialize};

/// Binding of a normalized Kerberos principal to a user.
///
/// Created on the first GSSAPI login so later logins skip provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Krb5Login {
    pub primary: String,
    pub user_id: uuid::Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewKrb5Login {
    pub primary: String,
    pub user_id: uuid::Uuid,
}
