use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Identity providers supported for sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    GitHub,
}

impl Provider {
    /// All providers, in the order they are registered at startup
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::GitHub];

    /// Provider identifier used in routes, cookies and `external_id` prefixes
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }

    /// Human readable provider name for logs
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::GitHub => "GitHub",
        }
    }

    /// Build a provider-qualified identifier so equal native ids from
    /// different providers never collide
    #[must_use]
    pub fn qualify(&self, native_id: &str) -> String {
        format!("{}:{native_id}", self.as_str())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::GitHub),
            other => Err(format!("Unknown provider: {other}")),
        }
    }
}

/// Normalized result of a successful provider exchange.
///
/// Lives only for the duration of the callback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// `"<provider>:<native id>"`
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub provider: Provider,
}

/// A login attempt in flight, correlated with the callback through the
/// `oauth_state` cookie.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub provider: Provider,
}

impl LoginAttempt {
    #[must_use]
    pub fn new(state: String, provider: Provider) -> Self {
        Self {
            state,
            created_at: Utc::now(),
            provider,
        }
    }
}

/// Signed assertion of identity carried in the `session` cookie.
///
/// Serialized field names follow the session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    #[serde(rename = "id")]
    pub external_id: String,
    pub email: Option<String>,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "picture")]
    pub avatar_url: Option<String>,
    pub provider: Provider,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    /// Derive a credential from a profile, valid from `issued_at` until `expires_at`
    #[must_use]
    pub fn from_profile(
        profile: &ProviderProfile,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id: profile.external_id.clone(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            provider: profile.provider,
            issued_at,
            expires_at,
        }
    }

    /// Check whether the credential has passed its expiry at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
