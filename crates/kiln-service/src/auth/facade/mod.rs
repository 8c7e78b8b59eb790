//! The auth facade: one entry point for login, logout and "who is this".

use std::{collections::HashMap, sync::Arc};

use kiln_core::{config::Settings, util::principal::normalize_principal};
use kiln_db::{
    model::{
        krb5_login::NewKrb5Login,
        user::{GroupSet, User},
    },
    store::UserStore,
};

use super::{
    directory::DirectoryClient,
    groups::GroupAuth,
    mechanism::{DirectoryMechanism, FederatedMechanism, LoginMechanism, Mechanism, MechanismKind},
    openid::{AuthResponse, OpenIdClient},
    provision::Provisioner,
};
use crate::{
    error::{ServiceError, ServiceResult},
    session::SessionState,
};

/// Prefix of every user-facing GSSAPI login failure.
pub const GSSAPI_ERROR_PREFIX: &str = "Can't log-in using GSSAPI: ";

#[derive(Debug, Clone)]
pub struct UserAuth {
    provisioner: Provisioner,
    group_auth: GroupAuth,
    /// Enabled mechanisms, federated first.
    mechanisms: Vec<Mechanism>,
}

impl UserAuth {
    /// ## Summary
    /// Builds the facade from settings, talking LDAP when it is configured.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` if the OpenID provider URL is invalid.
    pub fn new(settings: &Settings, store: Arc<dyn UserStore>) -> ServiceResult<Self> {
        Self::with_directory(
            settings,
            store,
            DirectoryClient::from_config(&settings.auth),
        )
    }

    /// ## Summary
    /// Builds the facade with an explicit directory client.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` if the OpenID provider URL is invalid.
    pub fn with_directory(
        settings: &Settings,
        store: Arc<dyn UserStore>,
        directory: Option<DirectoryClient>,
    ) -> ServiceResult<Self> {
        let auth = &settings.auth;

        let mut mechanisms = Vec::with_capacity(MechanismKind::ALL.len());
        if let Some(url) = auth.openid_provider_url.as_deref()
            && auth.fas_login
        {
            mechanisms.push(Mechanism::Federated(FederatedMechanism::new(
                Arc::new(OpenIdClient::new(url)?),
                &settings.server.origin(),
            )));
        }
        if auth.krb5_enabled() {
            mechanisms.push(Mechanism::Directory(DirectoryMechanism));
        }

        Ok(Self {
            provisioner: Provisioner::new(store, auth),
            group_auth: GroupAuth::new(auth.fas_login, directory.map(Arc::new)),
            mechanisms,
        })
    }

    #[must_use]
    pub const fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// The enabled mechanism of the given kind.
    #[must_use]
    pub fn mechanism(&self, kind: MechanismKind) -> Option<&Mechanism> {
        self.mechanisms.iter().find(|m| m.kind() == kind)
    }

    fn is_enabled(&self, kind: MechanismKind) -> bool {
        self.mechanism(kind).is_some()
    }

    fn federated(&self) -> Option<&FederatedMechanism> {
        match self.mechanism(MechanismKind::Federated)? {
            Mechanism::Federated(m) => Some(m),
            Mechanism::Directory(_) => None,
        }
    }

    fn store(&self) -> &Arc<dyn UserStore> {
        self.provisioner.store()
    }

    /// ## Summary
    /// Returns where to send the browser to log in with `kind`.
    ///
    /// A session whose marker resolves to a known user goes straight to
    /// `next`. A marker naming an unknown user does not count.
    ///
    /// ## Errors
    /// - `NoAuthMethod` if `kind` is not enabled.
    /// - Store errors.
    pub async fn login(
        &self,
        kind: MechanismKind,
        session: &dyn SessionState,
        next: &str,
    ) -> ServiceResult<String> {
        if self.current_user(session).await?.is_some() {
            return Ok(next.to_string());
        }

        let mechanism = self.mechanism(kind).ok_or(ServiceError::NoAuthMethod)?;
        Ok(mechanism.login(next))
    }

    /// Clears every login marker from the session.
    pub fn logout(&self, session: &mut dyn SessionState) {
        let username = self.current_username(session);

        for kind in MechanismKind::ALL {
            match self.mechanism(kind) {
                Some(mechanism) => mechanism.logout(session),
                // left over from before the mechanism was disabled
                None => session.remove(kind.session_key()),
            }
        }

        if let Some(username) = username {
            tracing::info!(user = %username, "User logged out");
        }
    }

    /// Username of the logged-in user, federated login first. Markers of
    /// mechanisms that are not enabled are ignored.
    #[must_use]
    pub fn current_username(&self, session: &dyn SessionState) -> Option<String> {
        self.mechanisms.iter().find_map(|mechanism| {
            let principal = mechanism.current_principal(session)?;
            Some(match mechanism.kind() {
                MechanismKind::Federated => self.provisioner.federated_username(&principal),
                MechanismKind::Directory => principal,
            })
        })
    }

    /// ## Summary
    /// Returns the logged-in user, `None` for anonymous sessions.
    ///
    /// A marker naming an unknown user counts as anonymous.
    ///
    /// ## Errors
    /// Returns store errors.
    pub async fn current_user(&self, session: &dyn SessionState) -> ServiceResult<Option<User>> {
        let Some(username) = self.current_username(session) else {
            return Ok(None);
        };
        let user = self.store().get_user_by_name(&username).await?;
        if user.is_none() {
            tracing::warn!(user = %username, "Session refers to an unknown user");
        }
        Ok(user)
    }

    /// ## Summary
    /// Returns the user behind a login, provisioning it when needed.
    ///
    /// ## Errors
    /// - `NoAuthMethod` if no enabled mechanism applies to the inputs.
    /// - Provisioning errors.
    pub async fn user_object(
        &self,
        resp: Option<&AuthResponse>,
        username: Option<&str>,
    ) -> ServiceResult<User> {
        if let Some(resp) = resp.filter(|_| self.is_enabled(MechanismKind::Federated)) {
            return self.provisioner.from_federated_response(resp).await;
        }

        if let Some(username) = username.filter(|_| self.is_enabled(MechanismKind::Directory)) {
            return self.provisioner.from_directory_username(username).await;
        }

        Err(ServiceError::NoAuthMethod)
    }

    /// ## Errors
    /// See [`GroupAuth::groups`].
    pub async fn groups(
        &self,
        resp: Option<&AuthResponse>,
        username: Option<&str>,
    ) -> ServiceResult<GroupSet> {
        self.group_auth.groups(resp, username).await
    }

    /// ## Errors
    /// See [`GroupAuth::group_names`].
    pub async fn group_names(
        &self,
        resp: Option<&AuthResponse>,
        username: Option<&str>,
    ) -> ServiceResult<Option<Vec<String>>> {
        self.group_auth.group_names(resp, username).await
    }

    /// ## Summary
    /// Verifies an OpenID callback with the provider.
    ///
    /// ## Errors
    /// - `NoAuthMethod` if federated login is disabled.
    /// - Errors of [`OpenIdClient::verify`].
    pub async fn verify_openid(
        &self,
        params: &HashMap<String, String>,
    ) -> ServiceResult<AuthResponse> {
        let federated = self.federated().ok_or(ServiceError::NoAuthMethod)?;
        federated
            .client()
            .verify(params, &federated.return_to_base())
            .await
    }

    /// ## Summary
    /// Finishes a federated login from a verified response.
    ///
    /// ## Errors
    /// - `AccessRestricted` if the user is not on the allow-list.
    /// - Provisioning, group and store errors.
    #[tracing::instrument(skip(self, resp, session), fields(identity = %resp.identity_url))]
    pub async fn complete_openid_login(
        &self,
        resp: &AuthResponse,
        session: &mut dyn SessionState,
    ) -> ServiceResult<User> {
        let username = self.provisioner.federated_username(&resp.identity_url);
        if !self.provisioner.is_user_allowed(&username) {
            tracing::warn!(user = %username, "Login refused, user not allowed");
            return Err(ServiceError::AccessRestricted(format!(
                "User '{username}' is not allowed"
            )));
        }

        let mut user = self.user_object(Some(resp), None).await?;
        user.openid_groups = Some(self.groups(Some(resp), None).await?);
        let user = self.store().save_user(&user).await?;

        session.set(MechanismKind::Federated.session_key(), resp.identity_url.clone());
        tracing::info!(user = %user.name, role = user.role(), "{} '{}' logged in", user.role(), user.name);
        Ok(user)
    }

    /// ## Summary
    /// Logs in the Kerberos principal the fronting web server authenticated.
    ///
    /// ## Errors
    /// - `AccessRestricted` / `InvalidUsername`, prefixed with
    ///   [`GSSAPI_ERROR_PREFIX`], for missing or unusable credentials.
    /// - `NoAuthMethod` if Kerberos login is disabled.
    /// - Provisioning, directory and store errors.
    #[tracing::instrument(skip(self, session))]
    pub async fn complete_gssapi_login(
        &self,
        remote_user: Option<&str>,
        session: &mut dyn SessionState,
    ) -> ServiceResult<User> {
        self.gssapi_login(remote_user, session)
            .await
            .map_err(|err| match err {
                ServiceError::AccessRestricted(msg) => {
                    ServiceError::AccessRestricted(format!("{GSSAPI_ERROR_PREFIX}{msg}"))
                }
                ServiceError::InvalidUsername(msg) => {
                    ServiceError::InvalidUsername(format!("{GSSAPI_ERROR_PREFIX}{msg}"))
                }
                other => other,
            })
    }

    async fn gssapi_login(
        &self,
        remote_user: Option<&str>,
        session: &mut dyn SessionState,
    ) -> ServiceResult<User> {
        if !self.is_enabled(MechanismKind::Directory) {
            return Err(ServiceError::NoAuthMethod);
        }

        if let Some(user) = self.current_user(session).await? {
            tracing::debug!(user = %user.name, "Already logged in");
            return Ok(user);
        }

        let principal = remote_user.filter(|p| !p.is_empty()).ok_or_else(|| {
            ServiceError::AccessRestricted(
                "Kerberos authentication failed (no credentials provided)".to_string(),
            )
        })?;

        let username = normalize_principal(principal).ok_or_else(|| {
            ServiceError::InvalidUsername(format!("invalid krb5 username: {principal}"))
        })?;

        let store = self.store();
        let mut user = if let Some(binding) = store.get_krb5_login(&username).await? {
            store.get_user_by_id(binding.user_id).await?.ok_or(
                ServiceError::InvariantViolation("krb5 binding refers to a missing user"),
            )?
        } else {
            let user = self.user_object(None, Some(&username)).await?;
            tracing::info!(principal = %principal, user = %user.name, "First krb5 login, binding principal");
            store
                .create_krb5_login(NewKrb5Login {
                    primary: username.clone(),
                    user_id: user.id,
                })
                .await?;
            user
        };

        user.openid_groups = Some(self.groups(None, Some(&username)).await?);
        let user = store.save_user(&user).await?;

        session.set(MechanismKind::Directory.session_key(), user.name.clone());
        tracing::info!(user = %user.name, role = user.role(), "{} '{}' logged in", user.role(), user.name);
        Ok(user)
    }
}
