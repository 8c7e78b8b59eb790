//! OpenID 2.0 relying-party helpers for the federated login.
//!
//! ## Summary
//! Builds the `checkid_setup` redirect asking the provider for the `email`
//! and `timezone` claims (Simple Registration) and for all team memberships
//! (teams extension), parses the positive assertion the provider sends back,
//! and verifies it directly with the provider (`check_authentication`).

use std::collections::{HashMap, HashSet};

use url::Url;

use crate::error::{ServiceError, ServiceResult};

pub const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
pub const SREG_NS: &str = "http://openid.net/extensions/sreg/1.1";
pub const TEAMS_NS: &str = "http://ns.launchpad.net/2007/openid-teams";

const SREG_ALIAS: &str = "sreg";
const TEAMS_ALIAS: &str = "lp";

/// Claims requested through Simple Registration.
pub const REQUESTED_CLAIMS: [&str; 2] = ["email", "timezone"];

/// Teams query meaning "every group the user is a member of".
pub const ALL_GROUPS_QUERY: &str = "_FAS_ALL_GROUPS_";

/// Claims of one successful federated login.
///
/// Only lives for the duration of the login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub identity_url: String,
    pub email: Option<String>,
    pub timezone: Option<String>,
    /// Team memberships, `None` when the provider sent no teams extension.
    pub teams: Option<Vec<String>>,
}

/// Finds the alias a response uses for the extension namespace `ns`.
fn extension_alias<'a>(params: &'a HashMap<String, String>, ns: &str, default: &'a str) -> &'a str {
    params
        .iter()
        .find_map(|(key, value)| {
            key.strip_prefix("openid.ns.")
                .filter(|_| value == ns)
        })
        .unwrap_or(default)
}

/// Parsed `openid.signed` list; `None` when the response carries none.
fn signed_fields(params: &HashMap<String, String>) -> Option<HashSet<&str>> {
    params
        .get("openid.signed")
        .map(|signed| signed.split(',').map(str::trim).collect())
}

fn extension_value(
    params: &HashMap<String, String>,
    signed: Option<&HashSet<&str>>,
    alias: &str,
    field: &str,
) -> Option<String> {
    let name = format!("{alias}.{field}");
    if signed.is_some_and(|signed| !signed.contains(name.as_str())) {
        tracing::debug!(field = %name, "Ignoring unsigned extension field");
        return None;
    }
    params
        .get(&format!("openid.{name}"))
        .filter(|value| !value.is_empty() || field == "is_member")
        .cloned()
}

/// Parses a key-value form body (`key:value` lines).
fn parse_key_value_form(body: &str) -> HashMap<&str, &str> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

/// Compares two URLs ignoring a trailing slash on the path.
fn same_endpoint(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

#[derive(Debug, Clone)]
pub struct OpenIdClient {
    provider_url: Url,
    http_client: reqwest::Client,
}

impl OpenIdClient {
    /// ## Summary
    /// Creates a client for the provider at `provider_url`, which is used as
    /// the OP endpoint directly.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` if the URL does not parse.
    pub fn new(provider_url: &str) -> ServiceResult<Self> {
        let provider_url = Url::parse(provider_url).map_err(|e| {
            ServiceError::InvalidConfiguration(format!(
                "invalid OpenID provider URL '{provider_url}': {e}"
            ))
        })?;

        Ok(Self {
            provider_url,
            http_client: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub const fn provider_url(&self) -> &Url {
        &self.provider_url
    }

    #[must_use]
    pub fn provider_host(&self) -> Option<&str> {
        self.provider_url.host_str()
    }

    /// ## Summary
    /// Returns the URL the browser is redirected to for a federated login.
    #[tracing::instrument(skip(self), fields(provider = %self.provider_url))]
    pub fn checkid_setup_url(&self, return_to: &str, realm: &str) -> String {
        let mut url = self.provider_url.clone();

        url.query_pairs_mut()
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.claimed_id", IDENTIFIER_SELECT)
            .append_pair("openid.identity", IDENTIFIER_SELECT)
            .append_pair("openid.return_to", return_to)
            .append_pair("openid.realm", realm)
            .append_pair(&format!("openid.ns.{SREG_ALIAS}"), SREG_NS)
            .append_pair(
                &format!("openid.{SREG_ALIAS}.required"),
                &REQUESTED_CLAIMS.join(","),
            )
            .append_pair(&format!("openid.ns.{TEAMS_ALIAS}"), TEAMS_NS)
            .append_pair(
                &format!("openid.{TEAMS_ALIAS}.query_membership"),
                ALL_GROUPS_QUERY,
            );

        url.to_string()
    }

    /// ## Summary
    /// Extracts the claims of a positive assertion.
    ///
    /// Does not check the signature; use [`Self::verify`] on untrusted input.
    ///
    /// ## Errors
    /// - `LoginCancelled` if the user cancelled at the provider.
    /// - `OpenIdError` if the response is not a positive assertion.
    pub fn parse_assertion(params: &HashMap<String, String>) -> ServiceResult<AuthResponse> {
        match params.get("openid.mode").map(String::as_str) {
            Some("id_res") => {}
            Some("cancel") => return Err(ServiceError::LoginCancelled),
            Some("error") => {
                return Err(ServiceError::OpenIdError(
                    params
                        .get("openid.error")
                        .cloned()
                        .unwrap_or_else(|| "provider reported an error".to_string()),
                ));
            }
            other => {
                return Err(ServiceError::OpenIdError(format!(
                    "unexpected openid.mode {other:?}"
                )));
            }
        }

        let identity_url = params
            .get("openid.claimed_id")
            .or_else(|| params.get("openid.identity"))
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or_else(|| ServiceError::OpenIdError("assertion carries no identity".to_string()))?;

        let signed = signed_fields(params);
        let sreg = extension_alias(params, SREG_NS, SREG_ALIAS);
        let teams = extension_alias(params, TEAMS_NS, TEAMS_ALIAS);

        let team_names = extension_value(params, signed.as_ref(), teams, "is_member").map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .collect()
        });

        Ok(AuthResponse {
            identity_url,
            email: extension_value(params, signed.as_ref(), sreg, "email"),
            timezone: extension_value(params, signed.as_ref(), sreg, "timezone"),
            teams: team_names,
        })
    }

    /// ## Summary
    /// Verifies an assertion with the provider and returns its claims.
    ///
    /// The assertion must come from the configured provider and be addressed
    /// to `return_to_base`; the provider must confirm it with `is_valid:true`.
    ///
    /// ## Errors
    /// - `LoginCancelled` / `OpenIdError` as in [`Self::parse_assertion`].
    /// - `OpenIdError` if the endpoint or return URL mismatch, or the provider
    ///   rejects the assertion.
    /// - `HttpError` if the provider cannot be reached.
    #[tracing::instrument(skip(self, params), fields(provider = %self.provider_url))]
    pub async fn verify(
        &self,
        params: &HashMap<String, String>,
        return_to_base: &str,
    ) -> ServiceResult<AuthResponse> {
        let response = Self::parse_assertion(params)?;

        let op_endpoint = params
            .get("openid.op_endpoint")
            .and_then(|endpoint| Url::parse(endpoint).ok())
            .ok_or_else(|| ServiceError::OpenIdError("missing openid.op_endpoint".to_string()))?;
        if !same_endpoint(&op_endpoint, &self.provider_url) {
            tracing::warn!(op_endpoint = %op_endpoint, "Assertion from unexpected provider");
            return Err(ServiceError::OpenIdError(format!(
                "assertion issued by unexpected provider {op_endpoint}"
            )));
        }

        if !params
            .get("openid.return_to")
            .is_some_and(|return_to| return_to.starts_with(return_to_base))
        {
            return Err(ServiceError::OpenIdError(
                "assertion addressed to another return URL".to_string(),
            ));
        }

        let form: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| key.starts_with("openid.") && key.as_str() != "openid.mode")
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .chain(std::iter::once(("openid.mode", "check_authentication")))
            .collect();

        let body = self
            .http_client
            .post(self.provider_url.clone())
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let fields = parse_key_value_form(&body);
        if fields.get("is_valid") != Some(&"true") {
            tracing::warn!(identity = %response.identity_url, "Provider rejected assertion");
            return Err(ServiceError::OpenIdError(
                "provider did not confirm the assertion".to_string(),
            ));
        }

        tracing::debug!(identity = %response.identity_url, "Assertion verified");
        Ok(response)
    }
}
