pub mod krb5_login;
pub mod user;
