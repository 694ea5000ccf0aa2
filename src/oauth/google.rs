//! Google OAuth provider adapter.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use url::Url;

use super::{OAuthError, ProviderAdapter, TokenResponse};
use crate::models::{Provider, ProviderProfile};
use crate::settings::ProviderSettings;
use crate::utils::logging::LoggingHelper;

pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const SCOPES: &str = "openid email profile";

/// Google `userinfo` v2 response; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleUserInfo {
    fn into_profile(self) -> ProviderProfile {
        let display_name = self
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.clone());
        ProviderProfile {
            external_id: Provider::Google.qualify(&self.id),
            email: self.email,
            display_name,
            avatar_url: self.picture,
            provider: Provider::Google,
        }
    }
}

/// Google endpoints, overridable for tests
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorization: Url,
    pub token: String,
    pub userinfo: String,
}

impl GoogleEndpoints {
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
                OAuthError::Configuration(format!("Invalid Google authorization endpoint: {e}"))
            })?,
            token: settings
                .token_endpoint
                .clone()
                .unwrap_or_else(|| TOKEN_ENDPOINT.to_string()),
            userinfo: settings
                .userinfo_endpoint
                .clone()
                .unwrap_or_else(|| USERINFO_ENDPOINT.to_string()),
        })
    }
}

/// Google OAuth adapter.
///
/// Handles the authorization redirect, the form-encoded code exchange and
/// the `userinfo` profile fetch.
pub struct GoogleAdapter {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: GoogleEndpoints,
    http_client: reqwest::Client,
}

impl GoogleAdapter {
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: GoogleEndpoints,
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
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        LoggingHelper::log_token_exchange_start(Provider::Google);
        let response = self
            .http_client
            .post(&self.endpoints.token)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::token_exchange(Provider::Google, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::token_exchange(Provider::Google, e.to_string()))?;

        TokenResponse::access_token_from(Provider::Google, status, &body)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleUserInfo, OAuthError> {
        let response = self
            .http_client
            .get(&self.endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::profile_fetch(Provider::Google, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::profile_fetch(Provider::Google, e.to_string()))?;

        if !status.is_success() {
            LoggingHelper::log_provider_error_body(
                Provider::Google,
                "profile fetch",
                status,
                &body,
            );
            return Err(OAuthError::profile_fetch(
                Provider::Google,
                format!("userinfo endpoint returned {status}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            LoggingHelper::log_provider_error_body(
                Provider::Google,
                "profile fetch",
                status,
                &body,
            );
            OAuthError::profile_fetch(Provider::Google, format!("unexpected profile shape: {e}"))
        })
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.endpoints.authorization.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        LoggingHelper::log_oauth_url_built(Provider::Google, SCOPES);
        url
    }

    async fn exchange_code_for_profile(&self, code: &str) -> Result<ProviderProfile, OAuthError> {
        let access_token = self.exchange_code(code).await?;
        let user_info = self.fetch_profile(&access_token).await?;
        debug!("Fetched Google profile for id {}", user_info.id);
        Ok(user_info.into_profile())
    }
}
