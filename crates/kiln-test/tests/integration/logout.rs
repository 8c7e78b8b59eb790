//! Logout integration tests.

use salvo::http::StatusCode;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn logout_ends_the_session() {
    let app = TestApp::krb5(FakeDirectory::new().with_user("carol", &[]));
    let cookie = app.gssapi_session("carol@EXAMPLE.COM").await;

    let response = TestRequest::get("/logout/?next=/coprs/")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header("Location", "/coprs/");

    let cleared = response
        .session_cookie()
        .expect("logout should rewrite the session cookie");

    TestRequest::get("/api_3/auth-check")
        .cookie(&cleared)
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn anonymous_logout_still_redirects() {
    let app = TestApp::krb5(FakeDirectory::new());

    TestRequest::get("/logout/")
        .send(&app.service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header("Location", "/");
}
