//! Test fixtures providing pre-built test objects

use chrono::Utc;

use super::constants::{
    TEST_EMAIL, TEST_GITHUB_CLIENT_ID, TEST_GOOGLE_CLIENT_ID, TEST_PROVIDER_ID,
    TEST_SESSION_SECRET, TEST_USER_NAME,
};
use crate::models::{Provider, ProviderProfile};
use crate::oauth::{CallbackOrchestrator, ProviderRegistry};
use crate::session::{IssuedSession, SessionIssuer};
use crate::settings::{AuthSettings, ProviderSettings};
use crate::utils::crypto::StateTokenGenerator;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Development settings with a signing secret and both providers
    /// configured from inline credentials (environment lookups disabled)
    #[must_use]
    pub fn settings() -> AuthSettings {
        let mut settings = AuthSettings::with_default_providers();
        settings.session.session_secret = TEST_SESSION_SECRET.to_string();
        for provider in &mut settings.providers {
            let client_id = match provider.name.as_str() {
                "github" => TEST_GITHUB_CLIENT_ID,
                _ => TEST_GOOGLE_CLIENT_ID,
            };
            provider.client_id = Some(client_id.to_string());
            provider.client_secret = Some(format!("{}-secret", provider.name));
            provider.client_id_env = None;
            provider.client_secret_env = None;
        }
        settings
    }

    /// Settings whose token and profile endpoints point at `base_url`
    /// (typically a mock server). Authorization endpoints keep their defaults.
    ///
    /// Paths: `/{provider}/token`, `/{provider}/userinfo`, `/github/emails`.
    #[must_use]
    pub fn settings_with_endpoints(base_url: &str) -> AuthSettings {
        let mut settings = Self::settings();
        for provider in &mut settings.providers {
            Self::point_at(provider, base_url);
        }
        settings
    }

    fn point_at(provider: &mut ProviderSettings, base_url: &str) {
        let name = provider.name.clone();
        provider.token_endpoint = Some(format!("{base_url}/{name}/token"));
        provider.userinfo_endpoint = Some(format!("{base_url}/{name}/userinfo"));
        if name == "github" {
            provider.emails_endpoint = Some(format!("{base_url}/github/emails"));
        }
    }

    /// Orchestrator wired from `settings`
    ///
    /// # Panics
    ///
    /// Panics if the settings cannot produce a registry or issuer
    #[must_use]
    pub fn orchestrator(settings: &AuthSettings) -> CallbackOrchestrator {
        let registry = ProviderRegistry::from_settings(settings).expect("registry from settings");
        let generator = StateTokenGenerator::new().expect("OS random source");
        CallbackOrchestrator::from_settings(settings, registry, generator)
            .expect("orchestrator from settings")
    }

    /// Issuer using the fixture secret and a 30 day lifetime
    ///
    /// # Panics
    ///
    /// Panics if the fixture secret is rejected
    #[must_use]
    pub fn session_issuer() -> SessionIssuer {
        SessionIssuer::new(TEST_SESSION_SECRET.as_bytes(), chrono::Duration::days(30))
            .expect("fixture secret is valid")
    }

    #[must_use]
    pub fn google_profile() -> ProviderProfile {
        ProviderProfile {
            external_id: Provider::Google.qualify(TEST_PROVIDER_ID),
            email: Some(TEST_EMAIL.to_string()),
            display_name: TEST_USER_NAME.to_string(),
            avatar_url: Some("https://example.com/avatar.png".to_string()),
            provider: Provider::Google,
        }
    }

    #[must_use]
    pub fn github_profile() -> ProviderProfile {
        ProviderProfile {
            external_id: Provider::GitHub.qualify(TEST_PROVIDER_ID),
            email: None,
            display_name: "octocat".to_string(),
            avatar_url: None,
            provider: Provider::GitHub,
        }
    }

    /// A session issued now for the Google fixture profile
    ///
    /// # Panics
    ///
    /// Panics if signing fails
    #[must_use]
    pub fn issued_session() -> IssuedSession {
        Self::session_issuer()
            .issue_at(&Self::google_profile(), Utc::now())
            .expect("fixture session signs")
    }
}
