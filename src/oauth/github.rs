//! GitHub OAuth provider adapter.
//!
//! GitHub's token endpoint answers `200 OK` with an `error` field on failure,
//! and `/user` omits private emails, so the primary address is read from
//! `/user/emails` separately.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{OAuthError, ProviderAdapter, TokenResponse};
use crate::models::{Provider, ProviderProfile};
use crate::settings::ProviderSettings;
use crate::utils::logging::LoggingHelper;

pub const AUTHORIZATION_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
pub const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
pub const USER_ENDPOINT: &str = "https://api.github.com/user";
pub const EMAILS_ENDPOINT: &str = "https://api.github.com/user/emails";
pub const SCOPES: &str = "read:user user:email";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

/// One entry of the `/user/emails` listing
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Pick the address to attach to the session: the primary verified one,
/// otherwise the first listed, otherwise none.
#[must_use]
pub fn select_primary_email(emails: &[GitHubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.first())
        .map(|e| e.email.clone())
}

#[derive(Debug, Clone)]
pub struct GitHubEndpoints {
    pub authorization: Url,
    pub token: String,
    pub user: String,
    pub emails: String,
}

impl GitHubEndpoints {
    /// Resolve endpoints, letting configured overrides replace the defaults
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::Configuration` if the authorization endpoint is not a valid URL
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, OAuthError> {
        let authorization = settings
            .authorization_endpoint
            .as_deref()
            .unwrap_or(AUTHORIZATION_ENDPOINT);
        Ok(Self {
            authorization: Url::parse(authorization).map_err(|e| {
                OAuthError::Configuration(format!("Invalid GitHub authorization endpoint: {e}"))
            })?,
            token: settings
                .token_endpoint
                .clone()
                .unwrap_or_else(|| TOKEN_ENDPOINT.to_string()),
            user: settings
                .userinfo_endpoint
                .clone()
                .unwrap_or_else(|| USER_ENDPOINT.to_string()),
            emails: settings
                .emails_endpoint
                .clone()
                .unwrap_or_else(|| EMAILS_ENDPOINT.to_string()),
        })
    }
}

pub struct GitHubAdapter {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: GitHubEndpoints,
    http_client: reqwest::Client,
}

impl GitHubAdapter {
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: GitHubEndpoints,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            endpoints,
            http_client,
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let payload = json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "code": code,
            "redirect_uri": self.redirect_uri,
        });

        LoggingHelper::log_token_exchange_start(Provider::GitHub);
        let response = self
            .http_client
            .post(&self.endpoints.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| OAuthError::token_exchange(Provider::GitHub, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::token_exchange(Provider::GitHub, e.to_string()))?;

        TokenResponse::access_token_from(Provider::GitHub, status, &body)
    }

    fn api_get(&self, url: &str, access_token: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("token {access_token}"))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, OAuthError> {
        let response = self
            .api_get(&self.endpoints.user, access_token)
            .send()
            .await
            .map_err(|e| OAuthError::profile_fetch(Provider::GitHub, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::profile_fetch(Provider::GitHub, e.to_string()))?;

        if !status.is_success() {
            LoggingHelper::log_provider_error_body(
                Provider::GitHub,
                "profile fetch",
                status,
                &body,
            );
            return Err(OAuthError::profile_fetch(
                Provider::GitHub,
                format!("user endpoint returned {status}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            LoggingHelper::log_provider_error_body(
                Provider::GitHub,
                "profile fetch",
                status,
                &body,
            );
            OAuthError::profile_fetch(Provider::GitHub, format!("unexpected profile shape: {e}"))
        })
    }

    /// Email lookup failures leave the profile without an email
    async fn fetch_primary_email(&self, access_token: &str) -> Option<String> {
        let response = match self.api_get(&self.endpoints.emails, access_token).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("GitHub email lookup failed: {e}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("GitHub email lookup returned {status}; continuing without email");
            return None;
        }

        match response.json::<Vec<GitHubEmail>>().await {
            Ok(emails) => select_primary_email(&emails),
            Err(e) => {
                warn!("GitHub email listing could not be parsed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.endpoints.authorization.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", SCOPES)
            .append_pair("state", state);
        LoggingHelper::log_oauth_url_built(Provider::GitHub, SCOPES);
        url
    }

    async fn exchange_code_for_profile(&self, code: &str) -> Result<ProviderProfile, OAuthError> {
        let access_token = self.exchange_code(code).await?;
        let user = self.fetch_user(&access_token).await?;
        let email = self.fetch_primary_email(&access_token).await;
        debug!("Fetched GitHub profile for {} (email present: {})", user.login, email.is_some());

        let display_name = user
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.login.clone());

        Ok(ProviderProfile {
            external_id: Provider::GitHub.qualify(&user.id.to_string()),
            email,
            display_name,
            avatar_url: user.avatar_url,
            provider: Provider::GitHub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn email(address: &str, primary: bool, verified: bool) -> GitHubEmail {
        GitHubEmail {
            email: address.to_string(),
            primary,
            verified,
        }
    }

    fn adapter(server_url: &str) -> GitHubAdapter {
        let settings = ProviderSettings {
            token_endpoint: Some(format!("{server_url}/login/oauth/access_token")),
            userinfo_endpoint: Some(format!("{server_url}/user")),
            emails_endpoint: Some(format!("{server_url}/user/emails")),
            ..ProviderSettings::for_provider(Provider::GitHub)
        };
        GitHubAdapter::new(
            "gh-client".to_string(),
            "gh-secret".to_string(),
            "http://localhost:3000/auth/github/callback".to_string(),
            GitHubEndpoints::from_settings(&settings).unwrap(),
            super::super::build_http_client(Duration::from_secs(5), "JustDone-App").unwrap(),
        )
    }

    #[test]
    fn test_select_primary_verified_email() {
        let emails = vec![
            email("a@x.com", false, true),
            email("b@x.com", true, true),
        ];
        assert_eq!(select_primary_email(&emails).as_deref(), Some("b@x.com"));
    }

    #[test]
    fn test_select_email_falls_back_to_first() {
        let emails = vec![
            email("first@x.com", false, false),
            email("unverified-primary@x.com", true, false),
        ];
        assert_eq!(select_primary_email(&emails).as_deref(), Some("first@x.com"));
    }

    #[test]
    fn test_select_email_empty_list() {
        assert_eq!(select_primary_email(&[]), None);
    }

    #[test]
    fn test_authorization_url() {
        let url = adapter("http://unused").authorization_url("xyz");
        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "gh-client");
        assert_eq!(pairs["redirect_uri"], "http://localhost:3000/auth/github/callback");
        assert_eq!(pairs["scope"], "read:user user:email");
        assert_eq!(pairs["state"], "xyz");
    }

    #[tokio::test]
    async fn test_exchange_code_for_profile() {
        let mut server = Server::new_async().await;
        let token_mock = server
            .mock("POST", "/login/oauth/access_token")
            .match_header("accept", "application/json")
            .match_body(Matcher::PartialJsonString(
                r#"{"client_id":"gh-client","code":"gh-code"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"gho_abc","token_type":"bearer","scope":"read:user,user:email"}"#)
            .create_async()
            .await;
        let _user = server
            .mock("GET", "/user")
            .match_header("authorization", "token gho_abc")
            .match_header("user-agent", "JustDone-App")
            .with_status(200)
            .with_body(r#"{"id":42,"login":"octocat","name":null,"avatar_url":"https://avatars.example/42"}"#)
            .create_async()
            .await;
        let _emails = server
            .mock("GET", "/user/emails")
            .match_header("authorization", "token gho_abc")
            .with_status(200)
            .with_body(
                r#"[{"email":"a@x.com","primary":false,"verified":true},
                    {"email":"b@x.com","primary":true,"verified":true}]"#,
            )
            .create_async()
            .await;

        let profile = adapter(&server.url())
            .exchange_code_for_profile("gh-code")
            .await
            .unwrap();

        token_mock.assert_async().await;
        assert_eq!(profile.external_id, "github:42");
        assert_eq!(profile.display_name, "octocat");
        assert_eq!(profile.email.as_deref(), Some("b@x.com"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://avatars.example/42"));
        assert_eq!(profile.provider, Provider::GitHub);
    }

    #[tokio::test]
    async fn test_error_in_ok_token_response() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_body(r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#)
            .create_async()
            .await;
        let user_mock = server.mock("GET", "/user").expect(0).create_async().await;

        let err = adapter(&server.url())
            .exchange_code_for_profile("stale")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::TokenExchange { .. }));
        assert!(!err.to_string().contains("incorrect or expired"));
        user_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_email_lookup_failure_degrades_to_none() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_body(r#"{"access_token":"gho_abc"}"#)
            .create_async()
            .await;
        let _user = server
            .mock("GET", "/user")
            .with_status(200)
            .with_body(r#"{"id":7,"login":"quiet","name":"Quiet Person"}"#)
            .create_async()
            .await;
        let _emails = server
            .mock("GET", "/user/emails")
            .with_status(403)
            .create_async()
            .await;

        let profile = adapter(&server.url())
            .exchange_code_for_profile("gh-code")
            .await
            .unwrap();
        assert_eq!(profile.email, None);
        assert_eq!(profile.display_name, "Quiet Person");
    }

    #[tokio::test]
    async fn test_user_endpoint_failure() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_body(r#"{"access_token":"gho_abc"}"#)
            .create_async()
            .await;
        let _user = server
            .mock("GET", "/user")
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let err = adapter(&server.url())
            .exchange_code_for_profile("gh-code")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::ProfileFetch { .. }));
    }
}
