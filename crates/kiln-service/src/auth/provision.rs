//! Identity provisioning: maps a validated external identity onto a user record.

use std::sync::Arc;

use kiln_core::config::AuthConfig;
use kiln_db::{
    model::user::{NewUser, User},
    store::UserStore,
};
use url::Url;

use super::openid::AuthResponse;
use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Converts a federated identity URL into a username.
///
/// - no host: returned unchanged
/// - provider host: first path segment (`https://id.example.org/alice` -> `alice`)
/// - subdomain of the provider host: the leading labels
///   (`https://alice.id.example.org/` -> `alice`)
/// - any other host: returned unchanged
#[must_use]
pub fn federated_username(identity_url: &str, provider_host: Option<&str>) -> String {
    let Ok(url) = Url::parse(identity_url) else {
        return identity_url.to_string();
    };
    let Some(host) = url.host_str().filter(|host| !host.is_empty()) else {
        return identity_url.to_string();
    };

    if let Some(provider_host) = provider_host {
        let provider_host = provider_host.to_ascii_lowercase();

        if host == provider_host {
            if let Some(name) = url
                .path_segments()
                .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            {
                return name.to_string();
            }
        } else if let Some(name) = host
            .strip_suffix(provider_host.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|name| !name.is_empty())
        {
            return name.to_string();
        }
    }

    tracing::warn!(
        identity = %identity_url,
        "Identity URL does not belong to the configured provider, using it verbatim"
    );
    identity_url.to_string()
}

#[derive(Clone)]
pub struct Provisioner {
    store: Arc<dyn UserStore>,
    fas_login: bool,
    provider_host: Option<String>,
    email_domain: Option<String>,
    use_allowed_users: bool,
    allowed_users: Vec<String>,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("fas_login", &self.fas_login)
            .field("provider_host", &self.provider_host)
            .field("email_domain", &self.email_domain)
            .field("use_allowed_users", &self.use_allowed_users)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, config: &AuthConfig) -> Self {
        let provider_host = config
            .openid_provider_url
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
            .and_then(|url| url.host_str().map(ToString::to_string));

        Self {
            store,
            fas_login: config.fas_login,
            provider_host,
            email_domain: config.krb5_email_domain().map(ToString::to_string),
            use_allowed_users: config.use_allowed_users,
            allowed_users: config.allowed_users.clone(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Username for a federated identity URL, see [`federated_username`].
    #[must_use]
    pub fn federated_username(&self, identity_url: &str) -> String {
        federated_username(identity_url, self.provider_host.as_deref())
    }

    /// Is this user allowed to log in?
    #[must_use]
    pub fn is_user_allowed(&self, username: &str) -> bool {
        if username.is_empty() {
            return false;
        }
        if !self.use_allowed_users {
            return true;
        }
        self.allowed_users.iter().any(|allowed| allowed == username)
    }

    /// ## Summary
    /// Returns the user behind a federated login, creating it on first sight.
    ///
    /// The returned user carries the e-mail and timezone of `resp`; the caller
    /// persists it.
    ///
    /// ## Errors
    /// - `ValidationError` if a new user would be created without an e-mail claim.
    /// - Store errors.
    #[tracing::instrument(skip(self, resp), fields(identity = %resp.identity_url))]
    pub async fn from_federated_response(&self, resp: &AuthResponse) -> ServiceResult<User> {
        let username = self.federated_username(&resp.identity_url);

        let mut user = if let Some(user) = self.store.get_user_by_name(&username).await? {
            user
        } else {
            tracing::info!(user = %username, "First login for user, creating a database record");

            let mail = resp.email.clone().ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "identity provider sent no e-mail for new user '{username}'"
                ))
            })?;

            self.store
                .create_user(NewUser {
                    name: username,
                    mail,
                    timezone: resp.timezone.clone(),
                })
                .await?
        };

        // The provider is authoritative for these attributes
        if let Some(email) = &resp.email {
            user.mail.clone_from(email);
        }
        user.timezone.clone_from(&resp.timezone);

        Ok(user)
    }

    /// ## Summary
    /// Returns the user behind a Kerberos login.
    ///
    /// Existing users are returned as stored. A new user is only created when
    /// federated login is disabled, with an e-mail synthesized from the
    /// configured Kerberos e-mail domain.
    ///
    /// ## Errors
    /// - `AccessRestricted` if the user is unknown and federated login is enabled.
    /// - `InvalidConfiguration` if no e-mail domain is configured.
    /// - Store errors.
    #[tracing::instrument(skip(self))]
    pub async fn from_directory_username(&self, username: &str) -> ServiceResult<User> {
        if let Some(user) = self.store.get_user_by_name(username).await? {
            return Ok(user);
        }

        // A Kerberos ticket alone carries neither e-mail nor groups
        if self.fas_login {
            return Err(ServiceError::AccessRestricted(format!(
                "Valid GSSAPI authentication supplied for user '{username}', but this \
                 user doesn't exist in the Kiln build system.  Please log-in \
                 using the web-UI (without GSSAPI) first."
            )));
        }

        let domain = self.email_domain.as_deref().ok_or_else(|| {
            ServiceError::InvalidConfiguration(
                "auth.krb5_login.email_domain is required to create users".to_string(),
            )
        })?;

        tracing::info!(user = %username, "Creating user from Kerberos login");
        Ok(self
            .store
            .create_user(NewUser {
                name: username.to_string(),
                mail: format!("{username}@{domain}"),
                timezone: None,
            })
            .await?)
    }
}
