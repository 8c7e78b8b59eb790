//! Minimal retrying directory (LDAP) client.
//!
//! ## Summary
//! Resolves a username to its directory entry and `memberOf` values. Every
//! request is a one-level search under a fixed base. Transient outages are
//! retried according to a [`RetryPolicy`]; any other directory failure is
//! surfaced at once with the directory's own message.

pub mod ldap;

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use kiln_core::config::{AuthConfig, LdapRetryConfig};

use crate::error::{ServiceError, ServiceResult};

/// Attributes requested for user lookups.
pub const USER_ATTRIBUTES: [&str; 4] = ["cn", "uid", "memberOf", "mail"];

pub const MEMBER_OF_ATTRIBUTE: &str = "memberOf";

/// One search result: the entry DN and its attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Attribute values by name; attribute names compare case-insensitively.
    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached; the same request may be retried.
    #[error("{0}")]
    Unavailable(String),
    /// The server answered with an error.
    #[error("{0}")]
    Failed(String),
}

/// A single one-level search against a directory server.
#[async_trait]
pub trait DirectoryTransport: Send + Sync {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, TransportError>;
}

/// How often and how fast to repeat a request while the directory is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` keeps retrying until the directory answers.
    pub max_attempts: Option<u32>,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    #[must_use]
    pub const fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
        }
    }

    #[must_use]
    pub const fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay,
        }
    }

    /// Returns `true` if another attempt may follow attempt number `attempt` (1-based).
    #[must_use]
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Self::DEFAULT_DELAY)
    }
}

impl From<&LdapRetryConfig> for RetryPolicy {
    fn from(config: &LdapRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// ## Summary
/// Builds a conjunctive LDAP filter `(&(k1=v1)(k2=v2)...)`.
///
/// Values are escaped per RFC 4515, except the presence value `*`. Without
/// criteria the filter matches any object class.
#[must_use]
pub fn build_filter(criteria: &[(&str, &str)]) -> String {
    let parts: String = if criteria.is_empty() {
        "(objectclass=*)".to_string()
    } else {
        criteria
            .iter()
            .map(|(key, value)| {
                if *value == "*" {
                    format!("({key}=*)")
                } else {
                    format!("({key}={})", ::ldap3::ldap_escape(*value))
                }
            })
            .collect()
    };
    format!("(&{parts})")
}

pub struct DirectoryClient {
    transport: Arc<dyn DirectoryTransport>,
    search_base: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("search_base", &self.search_base)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn DirectoryTransport>,
        search_base: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            search_base: search_base.into(),
            retry,
        }
    }

    /// ## Summary
    /// Creates an LDAP-backed client when both `ldap_url` and
    /// `ldap_search_string` are configured.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        let (url, base) = config.ldap()?;
        Some(Self::new(
            Arc::new(ldap::LdapTransport::new(url)),
            base,
            RetryPolicy::from(&config.ldap_retry),
        ))
    }

    #[must_use]
    pub fn search_base(&self) -> &str {
        &self.search_base
    }

    /// ## Summary
    /// Sends a search, repeating it while the directory is unavailable.
    ///
    /// ## Errors
    /// - `DirectoryError` with the directory's message on non-transient failures.
    /// - `DirectoryUnavailable` once a bounded retry policy is exhausted.
    #[tracing::instrument(skip(self, attrs), fields(base = %self.search_base))]
    pub async fn send_request(
        &self,
        attrs: &[&str],
        filter: &str,
    ) -> ServiceResult<Vec<DirectoryEntry>> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match self
                .transport
                .search(&self.search_base, filter, attrs)
                .await
            {
                Ok(entries) => {
                    tracing::trace!(attempt, count = entries.len(), "Directory search answered");
                    return Ok(entries);
                }
                Err(TransportError::Unavailable(msg)) => {
                    if !self.retry.allows_retry_after(attempt) {
                        tracing::error!(attempt, error = %msg, "Directory unavailable, giving up");
                        return Err(ServiceError::DirectoryUnavailable(msg));
                    }
                    tracing::warn!(
                        attempt,
                        error = %msg,
                        delay_ms = self.retry.delay.as_millis(),
                        "Directory unavailable, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(TransportError::Failed(msg)) => {
                    tracing::error!(error = %msg, "Directory search failed");
                    return Err(ServiceError::DirectoryError(msg));
                }
            }
        }
    }

    /// ## Summary
    /// Returns the first entry matching all `criteria`.
    ///
    /// ## Errors
    /// Returns `NotFound` if nothing matches, or any `send_request` error.
    pub async fn query_one(
        &self,
        attrs: &[&str],
        criteria: &[(&str, &str)],
    ) -> ServiceResult<DirectoryEntry> {
        let filter = build_filter(criteria);
        self.send_request(attrs, &filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("no directory entry for {filter}")))
    }

    /// ## Summary
    /// Returns the directory entry of `username`.
    ///
    /// ## Errors
    /// Returns `NotFound` if the user has no entry.
    pub async fn get_user(&self, username: &str) -> ServiceResult<DirectoryEntry> {
        self.query_one(&USER_ATTRIBUTES, &[("objectclass", "*"), ("uid", username)])
            .await
    }

    /// ## Summary
    /// Returns the raw `memberOf` DNs of `username`, `None` if the user is absent.
    ///
    /// ## Errors
    /// Returns directory errors other than a missing user.
    pub async fn get_user_groups(&self, username: &str) -> ServiceResult<Option<Vec<String>>> {
        match self.get_user(username).await {
            Ok(entry) => Ok(Some(
                entry
                    .values(MEMBER_OF_ATTRIBUTE)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default(),
            )),
            Err(ServiceError::NotFound(_)) => {
                tracing::debug!(user = %username, "User not present in directory");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
