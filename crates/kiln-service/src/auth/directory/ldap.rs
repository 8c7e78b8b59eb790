use std::time::Duration;

use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};

use super::{DirectoryEntry, DirectoryTransport, TransportError};

/// LDAP result codes meaning "try again later".
const RC_BUSY: u32 = 51;
const RC_UNAVAILABLE: u32 = 52;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// `DirectoryTransport` over `ldap3`, opening a new connection per request.
#[derive(Debug, Clone)]
pub struct LdapTransport {
    url: String,
    connect_timeout: Duration,
}

impl LdapTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Maps `ldap3` errors onto transient and permanent failures.
fn classify(err: LdapError) -> TransportError {
    match &err {
        LdapError::Io { .. } | LdapError::EndOfStream | LdapError::Timeout { .. } => {
            TransportError::Unavailable(err.to_string())
        }
        LdapError::LdapResult { result } if matches!(result.rc, RC_BUSY | RC_UNAVAILABLE) => {
            TransportError::Unavailable(err.to_string())
        }
        LdapError::LdapResult { result } if !result.text.is_empty() => {
            TransportError::Failed(result.text.clone())
        }
        _ => TransportError::Failed(err.to_string()),
    }
}

#[async_trait]
impl DirectoryTransport for LdapTransport {
    #[tracing::instrument(skip(self, attrs), fields(url = %self.url))]
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(classify)?;
        ldap3::drive!(conn);

        let (entries, _result) = ldap
            .search(base, Scope::OneLevel, filter, attrs.to_vec())
            .await
            .map_err(classify)?
            .success()
            .map_err(classify)?;

        if let Err(e) = ldap.unbind().await {
            tracing::debug!(error = %e, "LDAP unbind failed");
        }

        Ok(entries
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }
}
