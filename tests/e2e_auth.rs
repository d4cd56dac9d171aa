//! E2E tests for the GitHub sign-in flow and session gate

mod common;

use std::time::Duration;

use common::{Browser, TestServer, location, query_param};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_token(server: &TestServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_string_contains("client_id=test-client-id"))
        .and(body_string_contains("client_secret=test-client-secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-www-form-urlencoded")
                .set_body_string(body),
        )
        .mount(&server.github)
        .await;
}

async fn mount_user(server: &TestServer, profile: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer ABC123"))
        .and(header("user-agent", "github-signin-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile))
        .mount(&server.github)
        .await;
}

/// Start a sign-in and return the state GitHub would echo back
async fn begin_login(browser: &mut Browser) -> String {
    let response = browser.get("/login").await;
    assert_eq!(response.status(), 302);
    query_param(&location(&response), "state").expect("state parameter")
}

async fn sign_in(browser: &mut Browser) -> reqwest::Response {
    let state = begin_login(browser).await;
    browser
        .get(&format!("/callback?code=the-code&state={state}"))
        .await
}

#[tokio::test]
async fn test_landing_page_renders_sign_in_link() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("Sign In with GitHub"));
    assert!(body.contains(r#"href="/login""#));
    assert!(browser.cookie("sid").is_some(), "session cookie issued");
}

#[tokio::test]
async fn test_login_redirects_to_github_with_state_cookie() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/login").await;

    assert_eq!(response.status(), 302);
    let location = location(&response);
    assert!(location.starts_with(&format!("{}/login/oauth/authorize?", server.github.uri())));
    assert_eq!(
        query_param(&location, "client_id").as_deref(),
        Some("test-client-id")
    );
    assert_eq!(
        query_param(&location, "redirect_uri").as_deref(),
        Some("http://localhost:8080/callback")
    );
    assert_eq!(query_param(&location, "scope").as_deref(), Some("read:user"));

    let state = query_param(&location, "state").expect("state parameter");
    assert_eq!(browser.cookie("oauth_state"), Some(state.as_str()));
}

#[tokio::test]
async fn test_full_sign_in_stores_user_and_email() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read%3Auser&token_type=bearer").await;
    mount_user(&server, json!({"login": "octocat", "email": "octo@cat.com"})).await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;
    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/main");
    assert!(browser.cookie("oauth_state").is_none(), "state cookie cleared");

    let response = browser.get("/main").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Hello, octocat."));
    assert!(body.contains("octo@cat.com"));
}

#[tokio::test]
async fn test_null_email_still_authenticates() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    mount_user(&server, json!({"login": "octocat", "email": null})).await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;
    assert_eq!(location(&response), "/main");

    let response = browser.get("/main").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Hello, octocat."));
    assert!(body.contains("not public"));
}

#[tokio::test]
async fn test_signed_in_landing_forwards_through_callback() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    mount_user(&server, json!({"login": "octocat", "email": null})).await;
    let mut browser = server.browser();
    sign_in(&mut browser).await;

    let response = browser.get("/").await;
    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/callback");

    let response = browser.get("/callback").await;
    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/main");
}

#[tokio::test]
async fn test_gate_decision_is_stable_across_requests() {
    let server = TestServer::new().await;
    let mut browser = server.browser();
    browser.get("/").await;

    for _ in 0..2 {
        let response = browser.get("/main").await;
        assert_eq!(response.status(), 302);
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn test_callback_without_code_returns_to_landing_with_error() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/callback").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/?error=missing_code");

    let response = browser.get("/?error=missing_code").await;
    let body = response.text().await.unwrap();
    assert!(body.contains("did not return an authorization code"));
}

#[tokio::test]
async fn test_callback_rejects_mismatched_state_without_calling_github() {
    let server = TestServer::new().await;
    let mut browser = server.browser();
    begin_login(&mut browser).await;

    let response = browser.get("/callback?code=the-code&state=forged").await;

    assert_eq!(location(&response), "/?error=invalid_state");
    let received = server.github.received_requests().await.unwrap();
    assert!(received.is_empty(), "no upstream call on state mismatch");
}

#[tokio::test]
async fn test_callback_rejects_missing_state_cookie() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/callback?code=the-code&state=anything").await;

    assert_eq!(location(&response), "/?error=invalid_state");
}

#[tokio::test]
async fn test_declined_authorization_returns_to_landing() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser
        .get("/callback?error=access_denied&error_description=denied")
        .await;

    assert_eq!(location(&response), "/?error=access_denied");
}

#[tokio::test]
async fn test_token_endpoint_error_leaves_session_anonymous() {
    let server = TestServer::new().await;
    mount_token(
        &server,
        "error=bad_verification_code&error_description=The+code+passed+is+incorrect+or+expired.",
    )
    .await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;
    assert_eq!(location(&response), "/?error=token_exchange");

    let response = browser.get("/main").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_profile_failure_leaves_session_anonymous() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&server.github)
        .await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;
    assert_eq!(location(&response), "/?error=profile_fetch");

    let response = browser.get("/main").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_malformed_profile_is_a_profile_error() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server.github)
        .await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;
    assert_eq!(location(&response), "/?error=profile_fetch");
}

#[tokio::test]
async fn test_slow_provider_is_reported_unavailable() {
    let server = TestServer::with_config(|config| config.github.timeout_seconds = 1).await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("access_token=ABC123")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server.github)
        .await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;

    assert_eq!(location(&response), "/?error=upstream_unavailable");
}

#[tokio::test]
async fn test_query_token_placement() {
    let server = TestServer::with_config(|config| {
        config.github.token_placement = github_signin::config::TokenPlacement::Query;
    })
    .await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(wiremock::matchers::query_param("access_token", "ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .mount(&server.github)
        .await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;

    assert_eq!(location(&response), "/main");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    mount_user(&server, json!({"login": "octocat", "email": "octo@cat.com"})).await;
    let mut browser = server.browser();
    sign_in(&mut browser).await;
    let old_cookie = browser.cookie("sid").expect("session cookie").to_string();

    let response = browser.get("/logout").await;
    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(browser.cookie("sid").is_none(), "session cookie removed");

    // Replaying the old cookie must not resurrect the session
    browser.cookies.insert("sid".to_string(), old_cookie);
    let response = browser.get("/main").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_forged_session_cookie_is_ignored() {
    let server = TestServer::new().await;
    let mut browser = server.browser();
    browser
        .cookies
        .insert("sid".to_string(), "forged-id.c2lnbmF0dXJl".to_string());

    let response = browser.get("/main").await;

    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_non_get_requests_get_structured_error() {
    let server = TestServer::new().await;
    let client = common::no_redirect_client();

    let response = client
        .post(server.url("/callback?code=abc"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 405);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_sign_in_rotates_planted_session_identifier() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    mount_user(&server, json!({"login": "octocat", "email": "octo@cat.com"})).await;

    // A validly signed identifier obtained by someone else
    let mut attacker = server.browser();
    attacker.get("/").await;
    let planted = attacker.cookie("sid").expect("session cookie").to_string();

    let mut victim = server.browser();
    victim.cookies.insert("sid".to_string(), planted.clone());
    let response = sign_in(&mut victim).await;
    assert_eq!(location(&response), "/main");

    let rotated = victim.cookie("sid").expect("session cookie reissued");
    assert_ne!(rotated, planted);

    let response = victim.get("/main").await;
    assert_eq!(response.status(), 200);

    let response = attacker.get("/main").await;
    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_sign_in_restarts_session_cookie_lifetime() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    mount_user(&server, json!({"login": "octocat", "email": null})).await;
    let mut browser = server.browser();
    browser.get("/").await;

    let response = sign_in(&mut browser).await;

    let session_cookie = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("sid="))
        .expect("session cookie set at sign-in")
        .to_string();
    assert!(session_cookie.contains("Max-Age=3600"), "{session_cookie}");
}

#[tokio::test]
async fn test_failed_callback_keeps_signed_in_session() {
    let server = TestServer::new().await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    mount_user(&server, json!({"login": "octocat", "email": "octo@cat.com"})).await;
    let mut browser = server.browser();
    sign_in(&mut browser).await;

    begin_login(&mut browser).await;
    let response = browser.get("/callback?code=the-code&state=forged").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/main");

    let response = browser.get("/main").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Hello, octocat."));
}

#[tokio::test]
async fn test_slow_profile_endpoint_is_reported_unavailable() {
    let server = TestServer::with_config(|config| config.github.timeout_seconds = 1).await;
    mount_token(&server, "access_token=ABC123&scope=read:user").await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"login": "octocat"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server.github)
        .await;
    let mut browser = server.browser();

    let response = sign_in(&mut browser).await;
    assert_eq!(location(&response), "/?error=upstream_unavailable");

    let response = browser.get("/main").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_repeated_callback_parameters_return_to_landing() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/callback?code=a&code=b").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/?error=invalid_callback");
    let received = server.github.received_requests().await.unwrap();
    assert!(received.is_empty(), "no upstream call for an unreadable callback");
}

#[tokio::test]
async fn test_repeated_landing_error_is_ignored() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/?error=missing_code&error=x").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Sign In with GitHub"));
    assert!(!body.contains(r#"class="error""#));
}
