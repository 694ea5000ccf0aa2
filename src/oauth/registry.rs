//! Lookup table from provider name to its adapter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::github::{GitHubAdapter, GitHubEndpoints};
use super::google::{GoogleAdapter, GoogleEndpoints};
use super::{build_http_client, OAuthError, ProviderAdapter};
use crate::models::Provider;
use crate::settings::{AuthSettings, ProviderSettings};
use crate::utils::logging::LoggingHelper;

/// Adapters for every provider that is enabled and has credentials.
///
/// Providers missing from the registry answer 404 on their routes; the
/// others are unaffected.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for all configured providers
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or a configured
    /// endpoint override is not a valid URL
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, OAuthError> {
        LoggingHelper::log_oauth_provider_initialization();

        let http_client = build_http_client(
            Duration::from_secs(settings.http.timeout_seconds),
            &settings.http.user_agent,
        )?;
        let mut registry = Self::new();

        for provider_settings in &settings.providers {
            if !provider_settings.enabled {
                LoggingHelper::log_oauth_provider_disabled(&provider_settings.name);
                continue;
            }

            let Ok(provider) = provider_settings.name.parse::<Provider>() else {
                log::error!(
                    "❌ Unsupported provider '{}' in settings, skipping",
                    provider_settings.name
                );
                continue;
            };

            let (Some(client_id), Some(client_secret)) = (
                provider_settings.get_client_id(),
                provider_settings.get_client_secret(),
            ) else {
                LoggingHelper::log_oauth_provider_not_configured(provider);
                continue;
            };

            let callback_url = settings.callback_url(provider);
            let adapter = Self::build_adapter(
                provider,
                provider_settings,
                client_id,
                client_secret,
                callback_url.clone(),
                http_client.clone(),
            )?;
            LoggingHelper::log_oauth_provider_configured(provider, &callback_url);
            registry.register(adapter);
        }

        let names = registry.enabled_providers();
        LoggingHelper::log_oauth_providers_summary(&names);
        Ok(registry)
    }

    fn build_adapter(
        provider: Provider,
        provider_settings: &ProviderSettings,
        client_id: String,
        client_secret: String,
        callback_url: String,
        http_client: reqwest::Client,
    ) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        let adapter: Arc<dyn ProviderAdapter> = match provider {
            Provider::Google => Arc::new(GoogleAdapter::new(
                client_id,
                client_secret,
                callback_url,
                GoogleEndpoints::from_settings(provider_settings)?,
                http_client,
            )),
            Provider::GitHub => Arc::new(GitHubAdapter::new(
                client_id,
                client_secret,
                callback_url,
                GitHubEndpoints::from_settings(provider_settings)?,
                http_client,
            )),
        };
        Ok(adapter)
    }

    /// Register an adapter, replacing any previous one for the same provider
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    /// Look up an adapter by route name (`google`, `github`)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        let provider = name.parse::<Provider>().ok()?;
        self.adapters.get(&provider).cloned()
    }

    /// Names of registered providers, in registration order of `Provider::ALL`
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<&'static str> {
        Provider::ALL
            .iter()
            .filter(|p| self.adapters.contains_key(*p))
            .map(Provider::as_str)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.enabled_providers())
            .finish()
    }
}
