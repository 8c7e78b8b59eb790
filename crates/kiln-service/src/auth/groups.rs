//! Group authority: decides which source reports a user's group memberships.
//!
//! Exactly one source answers per call. A federated login response carries
//! its own team list; a Kerberos login of a federated account has no group
//! source at all; otherwise the directory is asked.

use std::sync::Arc;

use kiln_db::model::user::GroupSet;

use super::{directory::DirectoryClient, openid::AuthResponse};
use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Extracts the `cn` value of a DN-shaped group string.
///
/// The string is split on `,` then `=`; attribute names compare
/// case-insensitively and segments without `=` are ignored.
///
/// Examples:
/// - "cn=packager,ou=groups,dc=example,dc=com" -> `Some("packager")`
/// - "ou=groups,dc=example" -> `None`
#[must_use]
pub fn parse_group_dn(dn: &str) -> Option<String> {
    dn.split(',')
        .filter_map(|segment| segment.split_once('='))
        .find(|(attr, _)| attr.trim().eq_ignore_ascii_case("cn"))
        .map(|(_, value)| value.trim().to_string())
}

#[derive(Debug, Clone)]
pub struct GroupAuth {
    fas_login: bool,
    directory: Option<Arc<DirectoryClient>>,
}

impl GroupAuth {
    #[must_use]
    pub const fn new(fas_login: bool, directory: Option<Arc<DirectoryClient>>) -> Self {
        Self {
            fas_login,
            directory,
        }
    }

    /// ## Summary
    /// Returns the group set to store on the user after this login.
    ///
    /// ## Errors
    /// Same as [`Self::group_names`].
    pub async fn groups(
        &self,
        resp: Option<&AuthResponse>,
        username: Option<&str>,
    ) -> ServiceResult<GroupSet> {
        Ok(GroupSet::new(self.group_names(resp, username).await?))
    }

    /// ## Summary
    /// Returns the names of the groups the user belongs to.
    ///
    /// `Ok(None)` means the membership is unknown, which is a valid answer
    /// for Kerberos logins when federated login is the primary mechanism.
    ///
    /// ## Errors
    /// - `NoGroupSource` if no source applies to the given inputs.
    /// - Directory errors from the lookup.
    #[tracing::instrument(skip(self, resp), fields(federated = resp.is_some()))]
    pub async fn group_names(
        &self,
        resp: Option<&AuthResponse>,
        username: Option<&str>,
    ) -> ServiceResult<Option<Vec<String>>> {
        // Federated user via OpenID
        if let Some(resp) = resp {
            return Ok(resp.teams.clone());
        }

        // Federated user via Kerberos
        if self.fas_login && username.is_some() {
            return Ok(None);
        }

        if let (Some(username), Some(directory)) = (username, &self.directory) {
            let Some(dns) = directory.get_user_groups(username).await? else {
                return Ok(None);
            };

            let names = dns
                .iter()
                .filter_map(|dn| {
                    let name = parse_group_dn(dn);
                    if name.is_none() {
                        tracing::warn!(dn = %dn, "Group DN without cn, skipping");
                    }
                    name
                })
                .collect::<Vec<_>>();

            tracing::debug!(user = %username, group_count = names.len(), "Resolved directory groups");
            return Ok(Some(names));
        }

        Err(ServiceError::NoGroupSource)
    }
}
