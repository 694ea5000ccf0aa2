//! OAuth authentication module
//!
//! This module provides the provider adapters (Google, GitHub), the registry
//! that maps provider names to adapters, and the callback orchestrator that
//! drives one login attempt from redirect to issued session.

pub mod flow;
pub mod github;
pub mod google;
pub mod registry;

pub use flow::{CallbackOrchestrator, CompletedLogin, FlowError, FlowState, StartedLogin};
pub use github::GitHubAdapter;
pub use google::GoogleAdapter;
pub use registry::ProviderRegistry;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::models::{Provider, ProviderProfile};
use crate::utils::logging::LoggingHelper;

/// OAuth callback query parameters sent back by the provider
#[derive(Deserialize, Debug, Default)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Errors raised at the provider adapter boundary.
///
/// Messages carry only status codes and transport errors; raw provider
/// bodies are logged where they are received and never stored here.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token exchange with {provider} failed: {reason}")]
    TokenExchange { provider: Provider, reason: String },
    #[error("profile fetch from {provider} failed: {reason}")]
    ProfileFetch { provider: Provider, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OAuthError {
    pub(crate) fn token_exchange(provider: Provider, reason: impl Into<String>) -> Self {
        OAuthError::TokenExchange {
            provider,
            reason: reason.into(),
        }
    }

    pub(crate) fn profile_fetch(provider: Provider, reason: impl Into<String>) -> Self {
        OAuthError::ProfileFetch {
            provider,
            reason: reason.into(),
        }
    }
}

/// Token endpoint response shared by both providers.
///
/// `access_token` is optional because providers report failures in the same
/// shape (GitHub even with a 200 status).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Extract the access token from a raw token endpoint reply, logging the
    /// raw body server-side when none is present
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::TokenExchange` when the body is not JSON or has no access token
    pub fn access_token_from(
        provider: Provider,
        status: reqwest::StatusCode,
        body: &str,
    ) -> Result<String, OAuthError> {
        let Ok(response) = serde_json::from_str::<TokenResponse>(body) else {
            LoggingHelper::log_provider_error_body(provider, "token exchange", status, body);
            return Err(OAuthError::token_exchange(
                provider,
                format!("unparseable token response (status {status})"),
            ));
        };

        match response.access_token {
            Some(token) if !token.is_empty() => {
                LoggingHelper::log_token_exchange_success(
                    provider,
                    response.token_type.as_deref(),
                    response.scope.as_deref(),
                );
                Ok(token)
            }
            _ => {
                LoggingHelper::log_provider_error_body(provider, "token exchange", status, body);
                Err(OAuthError::token_exchange(
                    provider,
                    format!(
                        "no access token in response (status {status}, error {})",
                        response.error.as_deref().unwrap_or("none")
                    ),
                ))
            }
        }
    }
}

/// Uniform contract every identity provider implements
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter talks to
    fn provider(&self) -> Provider;

    /// The callback URL registered with the provider
    fn redirect_uri(&self) -> &str;

    /// Build the provider-hosted login URL carrying `state`. Pure; no network.
    fn authorization_url(&self, state: &str) -> Url;

    /// Exchange an authorization code for a normalized profile
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::TokenExchange` when no access token is obtained and
    /// `OAuthError::ProfileFetch` when the profile cannot be retrieved
    async fn exchange_code_for_profile(&self, code: &str) -> Result<ProviderProfile, OAuthError>;
}

/// Build the shared HTTP client used by an adapter for all provider calls
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized
pub fn build_http_client(
    timeout: std::time::Duration,
    user_agent: &str,
) -> Result<reqwest::Client, OAuthError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent.to_owned())
        .build()
        .map_err(|e| OAuthError::Configuration(format!("Failed to build HTTP client: {e}")))
}
