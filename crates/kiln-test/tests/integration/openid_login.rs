//! `/openid/callback/` integration tests against a mock provider.

use salvo::http::StatusCode;
use url::form_urlencoded;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method},
};

use super::helpers::*;

const SREG_NS: &str = "http://openid.net/extensions/sreg/1.1";
const TEAMS_NS: &str = "http://ns.launchpad.net/2007/openid-teams";

async fn provider(is_valid: bool, logins: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("openid.mode=check_authentication"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("ns:http://specs.openid.net/auth/2.0\nis_valid:{is_valid}\n")),
        )
        .expect(logins)
        .mount(&server)
        .await;
    server
}

/// Callback URL carrying a positive assertion for `username`.
fn callback(server: &MockServer, username: &str, email: &str, timezone: &str, teams: &str) -> String {
    let endpoint = format!("{}/", server.uri());
    let identity = format!("{}/{username}", server.uri());

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", "/coprs/")
        .append_pair("openid.ns", "http://specs.openid.net/auth/2.0")
        .append_pair("openid.mode", "id_res")
        .append_pair("openid.op_endpoint", &endpoint)
        .append_pair("openid.claimed_id", &identity)
        .append_pair("openid.identity", &identity)
        .append_pair(
            "openid.return_to",
            "https://kiln.example.com/openid/callback/?next=%2Fcoprs%2F",
        )
        .append_pair("openid.ns.sreg", SREG_NS)
        .append_pair("openid.sreg.email", email)
        .append_pair("openid.sreg.timezone", timezone)
        .append_pair("openid.ns.lp", TEAMS_NS)
        .append_pair("openid.lp.is_member", teams)
        .append_pair(
            "openid.signed",
            "op_endpoint,claimed_id,identity,return_to,sreg.email,sreg.timezone,lp.is_member",
        )
        .finish();

    format!("/openid/callback/?{query}")
}

async fn whoami(app: &TestApp, cookie: &str) -> serde_json::Value {
    TestRequest::get("/api_3/auth-check")
        .cookie(cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json()
}

#[test_log::test(tokio::test)]
async fn verified_login_redirects_and_sets_session() {
    let server = provider(true, 1).await;
    let app = TestApp::federated_at(&format!("{}/", server.uri()), FakeDirectory::new());

    let cookie = TestRequest::get(&callback(
        &server,
        "alice",
        "alice@example.org",
        "Europe/Prague",
        "packager",
    ))
    .send(&app.service)
    .await
    .assert_status(StatusCode::FOUND)
    .assert_header("Location", "/coprs/")
    .session_cookie()
    .expect("login should set a session cookie");

    let body = whoami(&app, &cookie).await;
    assert_eq!(body["name"], "alice");
    assert_eq!(body["mail"], "alice@example.org");
    assert_eq!(body["timezone"], "Europe/Prague");
    assert_eq!(body["groups"], serde_json::json!(["packager"]));
}

/// ## Summary
/// Every login overwrites mail, timezone and groups with the latest claims.
#[test_log::test(tokio::test)]
async fn latest_claims_win() {
    let server = provider(true, 2).await;
    let app = TestApp::federated_at(&format!("{}/", server.uri()), FakeDirectory::new());

    let first = TestRequest::get(&callback(
        &server,
        "alice",
        "alice@example.org",
        "Europe/Prague",
        "packager,qa",
    ))
    .send(&app.service)
    .await
    .assert_status(StatusCode::FOUND)
    .session_cookie()
    .expect("first login cookie");

    let second = TestRequest::get(&callback(
        &server,
        "alice",
        "alice@new.example.org",
        "UTC",
        "provenpackager",
    ))
    .send(&app.service)
    .await
    .assert_status(StatusCode::FOUND)
    .session_cookie()
    .expect("second login cookie");

    for cookie in [&first, &second] {
        let body = whoami(&app, cookie).await;
        assert_eq!(body["mail"], "alice@new.example.org");
        assert_eq!(body["timezone"], "UTC");
        assert_eq!(body["groups"], serde_json::json!(["provenpackager"]));
    }
    assert_eq!(app.store.user_count().await, 1);
}

#[test_log::test(tokio::test)]
async fn unconfirmed_assertion_does_not_log_in() {
    let server = provider(false, 1).await;
    let app = TestApp::federated_at(&format!("{}/", server.uri()), FakeDirectory::new());

    TestRequest::get(&callback(
        &server,
        "mallory",
        "mallory@example.org",
        "UTC",
        "",
    ))
    .send(&app.service)
    .await
    .assert_status(StatusCode::BAD_GATEWAY)
    .assert_body_contains("did not confirm");
    assert_eq!(app.store.user_count().await, 0);
}
