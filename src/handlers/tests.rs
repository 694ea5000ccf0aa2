// End-to-end tests for the login routes against a mock provider
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use std::io::Write;

use mockito::{Mock, Server, ServerGuard};

use super::configure_services;
use crate::models::SessionCredential;
use crate::session::{OAUTH_STATE_COOKIE, SESSION_COOKIE};
use crate::testing::{location, response_cookie, RequestBuilder, TestFixtures};

macro_rules! init_app {
    ($settings:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(TestFixtures::orchestrator(&$settings)))
                .configure(configure_services),
        )
        .await
    };
}

async fn mock_google_success(server: &mut ServerGuard) -> Vec<Mock> {
    let token = server
        .mock("POST", "/google/token")
        .with_status(200)
        .with_body(r#"{"access_token":"ya29.test","token_type":"Bearer"}"#)
        .create_async()
        .await;
    let profile = server
        .mock("GET", "/google/userinfo")
        .match_header("authorization", "Bearer ya29.test")
        .with_status(200)
        .with_body(r#"{"id":"123","email":"user@example.com","name":"User","picture":null}"#)
        .create_async()
        .await;
    vec![token, profile]
}

#[actix_web::test]
async fn test_sign_in_sets_state_cookie_and_redirects() {
    let app = init_app!(TestFixtures::settings());

    let req = RequestBuilder::new().uri("/auth/google").build().to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let state_cookie = response_cookie(&resp, OAUTH_STATE_COOKIE).expect("state cookie set");
    assert_eq!(state_cookie.http_only(), Some(true));
    assert!(state_cookie.value().len() >= 22);

    let target = url::Url::parse(&location(&resp).unwrap()).unwrap();
    assert_eq!(target.host_str(), Some("accounts.google.com"));
    assert_eq!(target.path(), "/o/oauth2/v2/auth");
    let state = target
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned());
    assert_eq!(state.as_deref(), Some(state_cookie.value()));
}

#[actix_web::test]
async fn test_unknown_or_unconfigured_provider_is_404() {
    let mut settings = TestFixtures::settings();
    settings.providers.retain(|p| p.name == "google");
    let app = init_app!(settings);

    for uri in ["/auth/github", "/auth/facebook", "/auth/github/callback?code=x&state=y"] {
        let req = RequestBuilder::new().uri(uri).build().to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_callback_state_mismatch_is_403_without_provider_call() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/google/token")
        .expect(0)
        .create_async()
        .await;
    let app = init_app!(TestFixtures::settings_with_endpoints(&server.url()));

    let mismatched = RequestBuilder::callback("google", Some("code"), Some("abc"))
        .state_cookie("xyz")
        .build()
        .to_request();
    let resp = test::call_service(&app, mismatched).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(response_cookie(&resp, SESSION_COOKIE).is_none());

    let no_cookie = RequestBuilder::callback("google", Some("code"), Some("abc"))
        .build()
        .to_request();
    let resp = test::call_service(&app, no_cookie).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("try signing in again"));

    token_mock.assert_async().await;
}

#[actix_web::test]
async fn test_callback_without_access_token_is_500_and_issues_no_session() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/google/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant","error_description":"leaky provider detail"}"#)
        .create_async()
        .await;
    let app = init_app!(TestFixtures::settings_with_endpoints(&server.url()));

    let req = RequestBuilder::callback("google", Some("code"), Some("s1"))
        .state_cookie("s1")
        .build()
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response_cookie(&resp, SESSION_COOKIE).is_none());

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(!text.contains("leaky provider detail"));
    assert!(!text.contains("invalid_grant"));
}

#[actix_web::test]
async fn test_successful_callback_issues_session_and_clears_state() {
    let mut server = Server::new_async().await;
    let _mocks = mock_google_success(&mut server).await;
    let settings = TestFixtures::settings_with_endpoints(&server.url());
    let app = init_app!(settings);

    let req = RequestBuilder::callback("google", Some("code"), Some("s1"))
        .state_cookie("s1")
        .build()
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp).as_deref(), Some("/"));

    let session = response_cookie(&resp, SESSION_COOKIE).expect("session cookie set");
    assert_eq!(session.http_only(), Some(true));
    assert_eq!(session.max_age().unwrap().whole_days(), 30);

    let cleared = response_cookie(&resp, OAUTH_STATE_COOKIE).expect("state cookie cleared");
    assert!(cleared.value().is_empty());
    assert!(cleared.max_age().unwrap().whole_seconds() <= 0);

    let credential = TestFixtures::session_issuer().verify(session.value()).unwrap();
    assert_eq!(credential.external_id, "google:123");
    assert_eq!(credential.email.as_deref(), Some("user@example.com"));
}

#[actix_web::test]
async fn test_replayed_callback_after_state_consumed_is_rejected() {
    let mut server = Server::new_async().await;
    let _mocks = mock_google_success(&mut server).await;
    let app = init_app!(TestFixtures::settings_with_endpoints(&server.url()));

    let first = RequestBuilder::callback("google", Some("code"), Some("s1"))
        .state_cookie("s1")
        .build()
        .to_request();
    let resp = test::call_service(&app, first).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let session = response_cookie(&resp, SESSION_COOKIE).unwrap();

    // The browser dropped the cleared state cookie but still holds the session
    let replay = RequestBuilder::callback("google", Some("code"), Some("s1"))
        .session_cookie(session.value())
        .build()
        .to_request();
    let resp = test::call_service(&app, replay).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_replayed_callback_with_state_cookie_runs_flow_again() {
    let mut server = Server::new_async().await;
    let _mocks = mock_google_success(&mut server).await;
    let app = init_app!(TestFixtures::settings_with_endpoints(&server.url()));

    // The state is checked per request; a browser still holding the cookie
    // passes the check again and the provider decides on the code
    for _ in 0..2 {
        let req = RequestBuilder::callback("google", Some("code"), Some("s1"))
            .state_cookie("s1")
            .build()
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert!(response_cookie(&resp, SESSION_COOKIE).is_some());
    }
}

#[actix_web::test]
async fn test_slow_provider_times_out_as_failure() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/google/token")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(std::time::Duration::from_secs(3));
            w.write_all(br#"{"access_token":"ya29.late","token_type":"Bearer"}"#)
        })
        .create_async()
        .await;
    let mut settings = TestFixtures::settings_with_endpoints(&server.url());
    settings.http.timeout_seconds = 1;
    let app = init_app!(settings);

    let req = RequestBuilder::callback("google", Some("code"), Some("s1"))
        .state_cookie("s1")
        .build()
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response_cookie(&resp, SESSION_COOKIE).is_none());
    let cleared = response_cookie(&resp, OAUTH_STATE_COOKIE).expect("state cookie cleared");
    assert!(cleared.value().is_empty());
}

#[actix_web::test]
async fn test_github_login_with_empty_email_list() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/github/token")
        .with_status(200)
        .with_body(r#"{"access_token":"gho_test","token_type":"bearer"}"#)
        .create_async()
        .await;
    let _user = server
        .mock("GET", "/github/userinfo")
        .match_header("authorization", "token gho_test")
        .with_status(200)
        .with_body(r#"{"id":99,"login":"octocat","name":null,"avatar_url":null}"#)
        .create_async()
        .await;
    let _emails = server
        .mock("GET", "/github/emails")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let app = init_app!(TestFixtures::settings_with_endpoints(&server.url()));

    let req = RequestBuilder::callback("github", Some("gh-code"), Some("s2"))
        .state_cookie("s2")
        .build()
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let session = response_cookie(&resp, SESSION_COOKIE).expect("session cookie set");
    let credential = TestFixtures::session_issuer().verify(session.value()).unwrap();
    assert_eq!(credential.external_id, "github:99");
    assert_eq!(credential.email, None);
    assert_eq!(credential.display_name, "octocat");
}

#[actix_web::test]
async fn test_me_and_logout() {
    let app = init_app!(TestFixtures::settings());

    let anonymous = RequestBuilder::new().uri("/auth/me").build().to_request();
    let resp = test::call_service(&app, anonymous).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let issued = TestFixtures::issued_session();
    let req = RequestBuilder::new()
        .uri("/auth/me")
        .session_cookie(&issued.token)
        .build()
        .to_request();
    let credential: SessionCredential = test::call_and_read_body_json(&app, req).await;
    assert_eq!(credential, issued.credential);

    let forged = RequestBuilder::new()
        .uri("/auth/me")
        .session_cookie(&format!("{}x", issued.token))
        .build()
        .to_request();
    let resp = test::call_service(&app, forged).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let logout = RequestBuilder::new()
        .method(actix_web::http::Method::POST)
        .uri("/auth/logout")
        .session_cookie(&issued.token)
        .build()
        .to_request();
    let resp = test::call_service(&app, logout).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let cleared = response_cookie(&resp, SESSION_COOKIE).unwrap();
    assert!(cleared.value().is_empty());
}

#[actix_web::test]
async fn test_me_reports_github_session_without_email() {
    let app = init_app!(TestFixtures::settings());
    let issued = TestFixtures::session_issuer()
        .issue(&TestFixtures::github_profile())
        .unwrap();

    let req = RequestBuilder::new()
        .uri("/auth/me")
        .session_cookie(&issued.token)
        .build()
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["provider"], "github");
    assert_eq!(body["name"], "octocat");
    assert!(body["email"].is_null());
}

#[actix_web::test]
async fn test_health() {
    let app = init_app!(TestFixtures::settings());
    let req = RequestBuilder::new().uri("/ping").build().to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
