// Centralized logging utilities for the login flow
use log::{debug, error, info, warn};

use crate::models::Provider;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log OAuth provider initialization start
    pub fn log_oauth_provider_initialization() {
        info!("🔧 Initializing OAuth providers from configuration...");
    }

    /// Log that a provider is disabled
    pub fn log_oauth_provider_disabled(provider_name: &str) {
        info!("⏭️  Provider {provider_name} is disabled, skipping");
    }

    /// Log that a provider is configured
    pub fn log_oauth_provider_configured(provider: Provider, callback_url: &str) {
        info!(
            "✅ {} OAuth2 configured ({provider}), callback: {callback_url}",
            provider.display_name()
        );
    }

    /// Log that a provider is not configured
    pub fn log_oauth_provider_not_configured(provider: Provider) {
        warn!(
            "❌ {} OAuth2 not configured - missing client id/secret, routes disabled",
            provider.display_name()
        );
    }

    /// Log summary of configured OAuth providers
    pub fn log_oauth_providers_summary(provider_names: &[&str]) {
        if provider_names.is_empty() {
            warn!("⚠️  No OAuth providers are configured; every login route will return 404");
        } else {
            info!("🎯 Configured OAuth providers: {provider_names:?}");
        }
    }

    /// Log OAuth URL building
    pub fn log_oauth_url_built(provider: Provider, scopes: &str) {
        debug!("🔍 Built {provider} OAuth URL with scopes: {scopes}");
    }

    /// Log token exchange start
    pub fn log_token_exchange_start(provider: Provider) {
        info!("🔄 Exchanging authorization code for tokens with {provider}");
    }

    /// Log token exchange summary
    pub fn log_token_exchange_success(
        provider: Provider,
        token_type: Option<&str>,
        scope: Option<&str>,
    ) {
        debug!(
            "Token exchange with {provider} succeeded: token_type={}, scope={}",
            token_type.unwrap_or("unspecified"),
            scope.unwrap_or("unspecified")
        );
    }

    /// Log the raw body a provider returned on failure. Server-side only.
    pub fn log_provider_error_body(
        provider: Provider,
        stage: &str,
        status: reqwest::StatusCode,
        body: &str,
    ) {
        error!("{provider} {stage} error (status {status}): {body}");
    }

    /// Log a rejected callback
    pub fn log_state_mismatch(provider: Provider, received: bool, stored: bool) {
        warn!(
            "OAuth state mismatch for {provider}: query state present={received}, cookie state present={stored}"
        );
    }

    /// Log session creation success
    pub fn log_session_issued(external_id: &str, provider: Provider) {
        info!("Issued session for {external_id} (provider: {provider})");
    }

    /// Log OAuth callback details in debug mode
    pub fn log_callback_debug(req: &actix_web::HttpRequest, provider: &str) {
        debug!(
            "OAuth callback for {provider} received via {} from {:?}",
            req.method(),
            req.connection_info().realip_remote_addr()
        );
    }
}
