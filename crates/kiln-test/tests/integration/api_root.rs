//! API root integration tests.

use salvo::http::StatusCode;

use super::helpers::*;

/// ## Summary
/// Test that the API root reports its version to anonymous clients.
#[test_log::test(tokio::test)]
async fn api_root_reports_version() {
    let app = TestApp::krb5(FakeDirectory::new());

    let response = TestRequest::get("/api_3/")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(response.json(), serde_json::json!({ "version": 3 }));
}
