//! Login mechanisms: where to send the browser to log in, and which session
//! marker records the result.

use std::sync::Arc;

use kiln_core::constants::{GSSAPI_WEB_UI_LOGIN_ROUTE, NEXT_PARAM, OPENID_CALLBACK_ROUTE};
use url::form_urlencoded;

use super::openid::OpenIdClient;
use crate::session::{KRB5_SESSION_KEY, OPENID_SESSION_KEY, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MechanismKind {
    /// OpenID against the account system
    Federated,
    /// Kerberos/GSSAPI, groups from LDAP
    Directory,
}

impl MechanismKind {
    /// Every kind, in the order their session markers are consulted.
    pub const ALL: [Self; 2] = [Self::Federated, Self::Directory];

    /// Session key holding this mechanism's principal.
    #[must_use]
    pub const fn session_key(self) -> &'static str {
        match self {
            Self::Federated => OPENID_SESSION_KEY,
            Self::Directory => KRB5_SESSION_KEY,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Federated => "federated",
            Self::Directory => "directory",
        }
    }
}

impl std::fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn with_next(path: &str, next: &str) -> String {
    let next: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{path}?{NEXT_PARAM}={next}")
}

pub trait LoginMechanism {
    fn kind(&self) -> MechanismKind;

    /// URL to redirect the browser to in order to start a login.
    fn login(&self, next: &str) -> String;

    fn logout(&self, session: &mut dyn SessionState) {
        session.remove(self.kind().session_key());
    }

    /// Principal recorded by a previous login, if any.
    fn current_principal(&self, session: &dyn SessionState) -> Option<String> {
        session
            .get(self.kind().session_key())
            .filter(|principal| !principal.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct FederatedMechanism {
    client: Arc<OpenIdClient>,
    origin: String,
}

impl FederatedMechanism {
    #[must_use]
    pub fn new(client: Arc<OpenIdClient>, origin: &str) -> Self {
        Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub const fn client(&self) -> &Arc<OpenIdClient> {
        &self.client
    }

    /// Absolute URL of the OpenID callback, without query.
    #[must_use]
    pub fn return_to_base(&self) -> String {
        format!("{}{OPENID_CALLBACK_ROUTE}", self.origin)
    }
}

impl LoginMechanism for FederatedMechanism {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Federated
    }

    fn login(&self, next: &str) -> String {
        let return_to = with_next(&self.return_to_base(), next);
        let realm = format!("{}/", self.origin);
        self.client.checkid_setup_url(&return_to, &realm)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryMechanism;

impl LoginMechanism for DirectoryMechanism {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Directory
    }

    // Authentication happens in the web server in front of the GSSAPI route
    fn login(&self, next: &str) -> String {
        with_next(GSSAPI_WEB_UI_LOGIN_ROUTE, next)
    }
}

#[derive(Debug, Clone)]
pub enum Mechanism {
    Federated(FederatedMechanism),
    Directory(DirectoryMechanism),
}

impl LoginMechanism for Mechanism {
    fn kind(&self) -> MechanismKind {
        match self {
            Self::Federated(m) => m.kind(),
            Self::Directory(m) => m.kind(),
        }
    }

    fn login(&self, next: &str) -> String {
        match self {
            Self::Federated(m) => m.login(next),
            Self::Directory(m) => m.login(next),
        }
    }

    fn logout(&self, session: &mut dyn SessionState) {
        match self {
            Self::Federated(m) => m.logout(session),
            Self::Directory(m) => m.logout(session),
        }
    }

    fn current_principal(&self, session: &dyn SessionState) -> Option<String> {
        match self {
            Self::Federated(m) => m.current_principal(session),
            Self::Directory(m) => m.current_principal(session),
        }
    }
}
