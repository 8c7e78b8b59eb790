//! Authentication and authorization.
//!
//! Two mechanisms log users in: federated OpenID against the account system,
//! and Kerberos/GSSAPI terminated by the web server in front of us. Group
//! memberships come from the OpenID teams extension or from LDAP.

pub mod directory;
pub mod facade;
pub mod groups;
pub mod mechanism;
pub mod openid;
pub mod provision;

pub use facade::UserAuth;
pub use mechanism::MechanismKind;
