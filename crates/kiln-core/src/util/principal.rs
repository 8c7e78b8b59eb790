//! Normalization of Kerberos/GSSAPI principals into local usernames.
//!
//! ## Summary
//! A principal arrives as `USER@REALM` or `USER/INSTANCE@REALM`. The realm is
//! dropped, `/` becomes `_`, and the result must only contain letters, digits,
//! underscores, dashes and dots (the same restriction project names follow).

/// Returns `true` if `c` may appear in a normalized username.
#[must_use]
pub fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Returns `true` if `name` is a non-empty username made of allowed characters.
#[must_use]
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_username_char)
}

/// Clean up a raw principal and return a plain username.
///
/// Examples:
/// - "alice@EXAMPLE.COM" -> `Some("alice")`
/// - "alice/admin@EXAMPLE.COM" -> `Some("alice_admin")`
/// - "bad user!" -> `None`
///
/// Returns `None` instead of an error so the caller decides how the rejection
/// is presented.
#[must_use]
pub fn normalize_principal(raw: &str) -> Option<String> {
    let without_realm = raw.split_once('@').map_or(raw, |(user, _realm)| user);
    let username = without_realm.replace('/', "_");

    is_valid_username(&username).then_some(username)
}
