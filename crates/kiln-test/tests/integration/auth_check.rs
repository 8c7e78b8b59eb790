//! `/api_3/auth-check` integration tests.

use salvo::http::StatusCode;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn anonymous_session_is_unauthorized() {
    let app = TestApp::krb5(FakeDirectory::new());

    TestRequest::get("/api_3/auth-check")
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_body_contains("Not authenticated");
}

#[test_log::test(tokio::test)]
async fn logged_in_session_returns_user() {
    let app = TestApp::krb5(FakeDirectory::new().with_user("carol", &["packager"]));
    let cookie = app.gssapi_session("carol@EXAMPLE.COM").await;

    let response = TestRequest::get("/api_3/auth-check")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);

    let body = response.json();
    assert_eq!(body["name"], "carol");
    assert_eq!(body["mail"], "carol@example.com");
    assert_eq!(body["groups"], serde_json::json!(["packager"]));
}

/// ## Summary
/// A session naming a user the store does not know is anonymous.
#[test_log::test(tokio::test)]
async fn session_of_unknown_user_is_anonymous() {
    let app = TestApp::krb5(FakeDirectory::new().with_user("carol", &[]));
    let cookie = app.gssapi_session("carol@EXAMPLE.COM").await;

    let other = TestApp::krb5(FakeDirectory::new());
    TestRequest::get("/api_3/auth-check")
        .cookie(&cookie)
        .send(&other.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
