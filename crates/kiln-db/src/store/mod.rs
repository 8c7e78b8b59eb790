//! Persistence seam for users and Kerberos bindings.
//!
//! The authentication layer only reads records and proposes mutations through
//! [`UserStore`]; transaction boundaries belong to the implementation.

pub mod memory;

use async_trait::async_trait;

use crate::{
    error::DbResult,
    model::{
        krb5_login::{Krb5Login, NewKrb5Login},
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized username.
    async fn get_user_by_name(&self, name: &str) -> DbResult<Option<User>>;

    async fn get_user_by_id(&self, id: uuid::Uuid) -> DbResult<Option<User>>;

    /// ## Summary
    /// Insert a new user.
    ///
    /// ## Errors
    /// Returns `Conflict` if the username is already taken.
    async fn create_user(&self, new_user: NewUser) -> DbResult<User>;

    /// ## Summary
    /// Replace the stored record of an existing user and return the saved copy.
    ///
    /// ## Errors
    /// Returns `NotFound` if no user with this id exists.
    async fn save_user(&self, user: &User) -> DbResult<User>;

    async fn get_krb5_login(&self, primary: &str) -> DbResult<Option<Krb5Login>>;

    /// ## Summary
    /// Bind a Kerberos principal to a user.
    ///
    /// ## Errors
    /// Returns `Conflict` if the principal is already bound, `NotFound` if the
    /// user does not exist.
    async fn create_krb5_login(&self, new_login: NewKrb5Login) -> DbResult<Krb5Login>;
}
