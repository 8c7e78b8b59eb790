#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building an isolated service (own store, own directory) per test
//! - Scripting the directory's answers and outages
//! - Making HTTP requests and carrying the session cookie between them
//! - Asserting on responses

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use salvo::http::header::HeaderName;
use salvo::http::{Method, StatusCode};
use salvo::prelude::*;
use salvo::test::{RequestBuilder, ResponseExt, TestClient};

use kiln_test::component::auth::{
    UserAuth,
    directory::{DirectoryClient, DirectoryEntry, DirectoryTransport, RetryPolicy, TransportError},
};
use kiln_test::component::config::{
    AuthConfig, Krb5LoginConfig, Krb5LoginSetting, LoggingConfig, ServerConfig, Settings,
};
use kiln_test::component::db::store::memory::MemoryStore;

pub use kiln_test::component::db::store::UserStore;
pub use kiln_test::component::db::model::user::NewUser;

pub const PROVIDER_URL: &str = "https://id.example.org/";
pub const SEARCH_BASE: &str = "ou=users,dc=example,dc=com";
pub const REMOTE_USER: &str = "X-Remote-User";

/// In-process directory: users and their group DNs, with an optional number
/// of leading outages.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    users: Mutex<HashMap<String, Vec<String>>>,
    outages: AtomicU32,
    searches: AtomicU32,
}

impl FakeDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `uid` as a member of the groups named in `groups`.
    #[must_use]
    pub fn with_user(self, uid: &str, groups: &[&str]) -> Self {
        self.users.lock().expect("users lock").insert(
            uid.to_string(),
            groups
                .iter()
                .map(|group| format!("cn={group},ou=groups,dc=example,dc=com"))
                .collect(),
        );
        self
    }

    /// The next `count` searches fail as if the server were unreachable.
    #[must_use]
    pub fn with_outages(self, count: u32) -> Self {
        self.outages.store(count, Ordering::SeqCst);
        self
    }

    pub fn search_count(&self) -> u32 {
        self.searches.load(Ordering::SeqCst)
    }
}

fn uid_from_filter(filter: &str) -> Option<&str> {
    filter.split("(uid=").nth(1)?.split(')').next()
}

#[async_trait]
impl DirectoryTransport for FakeDirectory {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        _attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        self.searches.fetch_add(1, Ordering::SeqCst);

        let remaining = self.outages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.outages.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Unavailable(
                "Can't contact LDAP server".to_string(),
            ));
        }

        let Some(uid) = uid_from_filter(filter) else {
            return Ok(Vec::new());
        };

        let users = self.users.lock().expect("users lock");
        Ok(users
            .get(uid)
            .map(|groups| {
                let mut attrs = HashMap::new();
                attrs.insert("uid".to_string(), vec![uid.to_string()]);
                attrs.insert("memberOf".to_string(), groups.clone());
                vec![DirectoryEntry {
                    dn: format!("uid={uid},{base}"),
                    attrs,
                }]
            })
            .unwrap_or_default())
    }
}

/// Test configuration - static struct instead of loading from file.
#[must_use]
pub fn test_settings(auth: AuthConfig) -> Settings {
    Settings {
        auth,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
            session_secret: "kiln-integration-test-session-secret-".repeat(2),
            public_url: Some("https://kiln.example.com".to_string()),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Kerberos only, groups from the directory.
#[must_use]
pub fn krb5_auth_config() -> AuthConfig {
    AuthConfig {
        krb5_login: Krb5LoginSetting::Config(Krb5LoginConfig {
            email_domain: "example.com".to_string(),
        }),
        remote_user_header: REMOTE_USER.to_string(),
        ..AuthConfig::default()
    }
}

/// Federated login primary, Kerberos for existing users.
#[must_use]
pub fn federated_auth_config() -> AuthConfig {
    federated_auth_config_at(PROVIDER_URL)
}

/// Same as [`federated_auth_config`], with the provider at `provider_url`.
#[must_use]
pub fn federated_auth_config_at(provider_url: &str) -> AuthConfig {
    AuthConfig {
        fas_login: true,
        openid_provider_url: Some(provider_url.to_string()),
        krb5_login: Krb5LoginSetting::Flag(true),
        remote_user_header: REMOTE_USER.to_string(),
        ..AuthConfig::default()
    }
}

/// A service with its own store and directory.
pub struct TestApp {
    pub service: Service,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<FakeDirectory>,
}

impl TestApp {
    /// ## Panics
    /// Panics if the service cannot be created.
    #[must_use]
    pub fn new(auth: AuthConfig, directory: FakeDirectory) -> Self {
        let settings = Arc::new(test_settings(auth));
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(directory);

        let client = DirectoryClient::new(
            directory.clone(),
            SEARCH_BASE,
            RetryPolicy::unbounded(Duration::from_millis(1)),
        );
        let auth = UserAuth::with_directory(&settings, store.clone(), Some(client))
            .expect("valid auth settings");
        let router = kiln_test::app::app::router(settings, Arc::new(auth))
            .expect("router should build");

        Self {
            service: Service::new(router),
            store,
            directory,
        }
    }

    #[must_use]
    pub fn krb5(directory: FakeDirectory) -> Self {
        Self::new(krb5_auth_config(), directory)
    }

    #[must_use]
    pub fn federated(directory: FakeDirectory) -> Self {
        Self::new(federated_auth_config(), directory)
    }

    #[must_use]
    pub fn federated_at(provider_url: &str, directory: FakeDirectory) -> Self {
        Self::new(federated_auth_config_at(provider_url), directory)
    }

    /// Logs `principal` in through the GSSAPI API and returns the session cookie.
    ///
    /// ## Panics
    /// Panics if the login fails.
    pub async fn gssapi_session(&self, principal: &str) -> String {
        TestRequest::get("/api_3/gssapi_login/")
            .header(REMOTE_USER, principal)
            .send(&self.service)
            .await
            .assert_status(StatusCode::OK)
            .session_cookie()
            .expect("login should set a session cookie")
    }
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
}

impl TestRequest {
    /// Creates a new test request with the given method and path.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
        }
    }

    /// Creates a new GET request.
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sends a `name=value` cookie pair.
    #[must_use]
    pub fn cookie(self, pair: &str) -> Self {
        self.header("Cookie", pair)
    }

    /// Sends the request to the test service and returns the response.
    ///
    /// ## Panics
    /// Panics if the request cannot be sent or the response cannot be read.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = match self.method.as_str() {
            "GET" => TestClient::get(&url),
            _ => RequestBuilder::new(&url, self.method.clone()),
        };

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        let mut response = client.send(service).await;

        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected} but got {}: {}",
            self.status,
            self.body_string()
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    #[must_use]
    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        let value = self
            .get_header(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found in response"));
        assert_eq!(
            value, expected,
            "Header '{name}' expected '{expected}' but got '{value}'"
        );
        self
    }

    /// Asserts that the response body contains the expected substring.
    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        let body = self.body_string();
        assert!(
            body.contains(expected),
            "Expected body to contain '{expected}' but got:\n{body}"
        );
        self
    }

    /// Returns the body as a UTF-8 string.
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// ## Panics
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `name=value` part of the last `Set-Cookie` header.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, v)| v.split(';').next())
            .map(|pair| pair.trim().to_string())
            .next_back()
    }
}
