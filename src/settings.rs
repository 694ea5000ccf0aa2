use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::Provider;

/// Upper bound on `session.session_duration_days` (ten years)
pub const MAX_SESSION_DURATION_DAYS: u64 = 3650;
/// Upper bound on `session.state_ttl_minutes` (one day)
pub const MAX_STATE_TTL_MINUTES: u64 = 24 * 60;

/// Errors raised while loading or validating settings at startup
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: basic_toml::Error,
    },
    #[error("session signing secret is not configured; set SESSION_SECRET (or JWT_SECRET)")]
    MissingSigningSecret,
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid setting: {0}")]
    Invalid(String),
    #[error("failed to initialize logger: {0}")]
    Logger(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    pub application: ApplicationSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
    pub providers: Vec<ProviderSettings>,
}

/// Deployment posture; production turns on `Secure` and `SameSite=None` cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") || value.eq_ignore_ascii_case("prod") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public URL the browser and the providers reach this service on
    pub base_url: String,
    pub environment: Environment,
    pub cors_origins: String,
    /// Where the browser lands after a successful login or logout
    pub post_login_redirect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub session_secret: String,
    pub session_duration_days: u64,
    /// Lifetime of the `oauth_state` cookie
    pub state_ttl_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CookieSettings {
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-call timeout for provider requests
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub name: String,
    pub enabled: bool,

    // Direct values (can be overridden by environment variables)
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Environment variable names for overrides
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,

    // Endpoint overrides; the provider's public endpoints are used when unset
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub emails_endpoint: Option<String>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: Environment::Development,
            cors_origins: "http://localhost:3000,http://localhost:5173".to_string(),
            post_login_redirect: "/".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_secret: String::new(), // Must be provided; there is no fallback
            session_duration_days: 30,
            state_ttl_minutes: 10,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: "JustDone-App".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            client_id: None,
            client_secret: None,
            client_id_env: None,
            client_secret_env: None,
            authorization_endpoint: None,
            token_endpoint: None,
            userinfo_endpoint: None,
            emails_endpoint: None,
        }
    }
}

impl ProviderSettings {
    /// Default settings for a provider, reading credentials from
    /// `<NAME>_CLIENT_ID` / `<NAME>_CLIENT_SECRET`
    #[must_use]
    pub fn for_provider(provider: Provider) -> Self {
        let prefix = provider.as_str().to_uppercase();
        Self {
            name: provider.as_str().to_string(),
            client_id_env: Some(format!("{prefix}_CLIENT_ID")),
            client_secret_env: Some(format!("{prefix}_CLIENT_SECRET")),
            ..Default::default()
        }
    }

    /// Get the client ID, checking the environment variable first and
    /// falling back to the direct value
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        Self::env_or_value(self.client_id_env.as_deref(), self.client_id.as_ref())
    }

    /// Get the client secret, checking the environment variable first and
    /// falling back to the direct value
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        Self::env_or_value(self.client_secret_env.as_deref(), self.client_secret.as_ref())
    }

    fn env_or_value(env_var: Option<&str>, value: Option<&String>) -> Option<String> {
        if let Some(env_var) = env_var {
            if let Ok(value) = std::env::var(env_var) {
                if !value.trim().is_empty() {
                    return Some(value);
                }
            }
        }
        value.filter(|v| !v.trim().is_empty()).cloned()
    }
}

impl AuthSettings {
    /// Settings with both supported providers registered and everything else defaulted
    #[must_use]
    pub fn with_default_providers() -> Self {
        Self {
            providers: Provider::ALL
                .iter()
                .map(|p| ProviderSettings::for_provider(*p))
                .collect(),
            ..Default::default()
        }
    }

    /// Load settings from configuration files and environment variables, then validate them
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (a `.env` file in the working directory is read first)
    /// 2. Settings.toml in `AUTH_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed, or if
    /// validation fails (most importantly when no signing secret is configured)
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.validate()?;

        Ok(settings)
    }

    fn load_base_settings() -> Result<Self, SettingsError> {
        let mut settings = Self::with_default_providers();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml_file(default_config_path)?;
            println!("✓ Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(secrets_dir) = std::env::var("AUTH_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_toml_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ AUTH_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a TOML settings file. Providers missing from the file are added
    /// with their defaults so environment credentials still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings: Self =
            basic_toml::from_str(&content).map_err(|source| SettingsError::Toml {
                path: path.display().to_string(),
                source,
            })?;
        settings.ensure_default_providers();
        Ok(settings)
    }

    fn ensure_default_providers(&mut self) {
        for provider in Provider::ALL {
            if self.get_provider(provider.as_str()).is_none() {
                self.providers.push(ProviderSettings::for_provider(provider));
            }
        }
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_http_env_overrides(&mut settings.http);
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            settings.logging.level = log_level;
        }
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(base_url) = std::env::var("BASE_URL") {
            app_settings.base_url = base_url;
        }
        if let Ok(environment) = std::env::var("APP_ENV") {
            app_settings.environment = Environment::parse(&environment);
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for session settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_numeric_env_override(
            "SESSION_DURATION_DAYS",
            &mut session_settings.session_duration_days,
        );

        // SESSION_SECRET wins over the legacy JWT_SECRET name
        let secret = ["SESSION_SECRET", "JWT_SECRET"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.is_empty());
        if let Some(secret) = secret {
            session_settings.session_secret = secret;
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(domain) = std::env::var("COOKIE_DOMAIN") {
            cookie_settings.domain = if domain.trim().is_empty() {
                None
            } else {
                Some(domain)
            };
        }
    }

    fn apply_http_env_overrides(http_settings: &mut HttpSettings) {
        Self::apply_numeric_env_override(
            "HTTP_TIMEOUT_SECONDS",
            &mut http_settings.timeout_seconds,
        );
        if let Ok(user_agent) = std::env::var("HTTP_USER_AGENT") {
            http_settings.user_agent = user_agent;
        }
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file without clobbering the real environment
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    if std::env::var_os(key).is_none() {
                        std::env::set_var(key, value.trim().trim_matches('"'));
                    }
                }
            }
        }
    }

    /// Check the invariants the service refuses to start without
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is empty, the base URL does not
    /// parse, or a duration is zero or above its bound
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.session.session_secret.trim().is_empty() {
            return Err(SettingsError::MissingSigningSecret);
        }
        url::Url::parse(&self.application.base_url)
            .map_err(|_| SettingsError::InvalidBaseUrl(self.application.base_url.clone()))?;
        if self.session.session_duration_days == 0 {
            return Err(SettingsError::Invalid(
                "session_duration_days must be greater than zero".to_string(),
            ));
        }
        if self.session.session_duration_days > MAX_SESSION_DURATION_DAYS {
            return Err(SettingsError::Invalid(format!(
                "session_duration_days must be at most {MAX_SESSION_DURATION_DAYS}"
            )));
        }
        if self.session.state_ttl_minutes == 0 {
            return Err(SettingsError::Invalid(
                "state_ttl_minutes must be greater than zero".to_string(),
            ));
        }
        if self.session.state_ttl_minutes > MAX_STATE_TTL_MINUTES {
            return Err(SettingsError::Invalid(format!(
                "state_ttl_minutes must be at most {MAX_STATE_TTL_MINUTES}"
            )));
        }
        if self.http.timeout_seconds == 0 {
            return Err(SettingsError::Invalid(
                "http.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Initialize `env_logger`, honouring `RUST_LOG` and falling back to `logging.level`
    ///
    /// # Errors
    ///
    /// Returns an error if a global logger is already installed
    pub fn init_logging(&self) -> Result<(), SettingsError> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.logging.level.as_str()),
        )
        .try_init()
        .map_err(|e| SettingsError::Logger(e.to_string()))
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.application.environment == Environment::Production
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.application.base_url.trim_end_matches('/')
    }

    /// The redirect URI registered with a provider; must match exactly on both legs of the flow
    #[must_use]
    pub fn callback_url(&self, provider: Provider) -> String {
        format!("{}/auth/{}/callback", self.base_url(), provider.as_str())
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Get provider by name
    #[must_use]
    pub fn get_provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.name == name)
    }
}
