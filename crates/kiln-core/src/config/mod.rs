use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Minimum length of the cookie session signing secret.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Kerberos login is either a plain switch or a table carrying the
/// domain used to synthesize e-mail addresses for new users.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Krb5LoginSetting {
    Flag(bool),
    Config(Krb5LoginConfig),
}

impl Default for Krb5LoginSetting {
    fn default() -> Self {
        Self::Flag(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Krb5LoginConfig {
    pub email_domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LdapRetryConfig {
    /// `None` retries until the directory answers.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

const fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for LdapRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Federated (OpenID) login is the primary mechanism.
    #[serde(default)]
    pub fas_login: bool,
    #[serde(default)]
    pub openid_provider_url: Option<String>,
    #[serde(default)]
    pub krb5_login: Krb5LoginSetting,
    /// Header the fronting proxy sets to the authenticated Kerberos principal.
    #[serde(default = "default_remote_user_header")]
    pub remote_user_header: String,
    #[serde(default)]
    pub ldap_url: Option<String>,
    #[serde(default)]
    pub ldap_search_string: Option<String>,
    #[serde(default)]
    pub ldap_retry: LdapRetryConfig,
    #[serde(default)]
    pub use_allowed_users: bool,
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

fn default_remote_user_header() -> String {
    "X-Remote-User".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            fas_login: false,
            openid_provider_url: None,
            krb5_login: Krb5LoginSetting::default(),
            remote_user_header: default_remote_user_header(),
            ldap_url: None,
            ldap_search_string: None,
            ldap_retry: LdapRetryConfig::default(),
            use_allowed_users: false,
            allowed_users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Returns `true` if Kerberos/GSSAPI login is enabled.
    #[must_use]
    pub const fn krb5_enabled(&self) -> bool {
        match &self.krb5_login {
            Krb5LoginSetting::Flag(enabled) => *enabled,
            Krb5LoginSetting::Config(_) => true,
        }
    }

    /// Returns the configured e-mail domain for Kerberos-provisioned users.
    #[must_use]
    pub fn krb5_email_domain(&self) -> Option<&str> {
        match &self.krb5_login {
            Krb5LoginSetting::Config(cfg) if !cfg.email_domain.is_empty() => {
                Some(cfg.email_domain.as_str())
            }
            _ => None,
        }
    }

    /// Returns the LDAP URL and search base when both are set and non-empty.
    #[must_use]
    pub fn ldap(&self) -> Option<(&str, &str)> {
        let url = self.ldap_url.as_deref().filter(|s| !s.is_empty())?;
        let base = self.ldap_search_string.as_deref().filter(|s| !s.is_empty())?;
        Some((url, base))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub public_url: Option<String>,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "http://host:port".
    #[must_use]
    pub fn serve_origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// ## Summary
    /// Returns the externally visible origin, without a trailing slash.
    #[must_use]
    pub fn origin(&self) -> String {
        if let Some(url) = &self.public_url {
            url.trim_end_matches('/').to_string()
        } else {
            self.serve_origin()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `config.toml` and `KILN__`-prefixed environment variables.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8698)?
            .set_default("logging.level", "debug")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env, e.g. KILN__AUTH__FAS_LOGIN=true
            .add_source(
                config::Environment::with_prefix("KILN")
                    .prefix_separator("__")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.allowed_users"),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Checks cross-field constraints that deserialization cannot express.
    ///
    /// ## Errors
    /// Returns `ConfigError` if federated login lacks a provider URL, no login
    /// mechanism is enabled, or the session secret is too short.
    pub fn validate(&self) -> CoreResult<()> {
        if self.auth.fas_login
            && self
                .auth
                .openid_provider_url
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(CoreError::ConfigError(
                "auth.fas_login requires auth.openid_provider_url".to_string(),
            ));
        }

        if !self.auth.fas_login && !self.auth.krb5_enabled() {
            return Err(CoreError::ConfigError(
                "no login mechanism enabled (auth.fas_login or auth.krb5_login)".to_string(),
            ));
        }

        if self.server.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(CoreError::ConfigError(format!(
                "server.session_secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }

        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading, deserializing or validating the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    settings.validate()?;
    tracing::debug!(
        fas_login = settings.auth.fas_login,
        krb5_login = settings.auth.krb5_enabled(),
        ldap = settings.auth.ldap().is_some(),
        "Authentication mechanisms configured"
    );
    Ok(settings)
}
