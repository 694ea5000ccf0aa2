//! Stateless session credentials signed as compact HS256 tokens.
//!
//! The server keeps no session store: a credential is valid exactly when its
//! signature checks out under the configured secret and `exp` is in the future.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::json;
use thiserror::Error;

use crate::models::{ProviderProfile, SessionCredential};
use crate::settings::{AuthSettings, SettingsError};
use crate::utils::crypto::{decode_segment, encode_segment, hmac_sha256_sign, hmac_sha256_verify};

/// Session signing and verification errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,
    #[error("unsupported session token algorithm")]
    UnsupportedAlgorithm,
    #[error("session token signature is invalid")]
    InvalidSignature,
    #[error("session token expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// A freshly issued credential together with its encoded token
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub credential: SessionCredential,
    pub token: String,
}

/// Signs session credentials with the process-wide secret
#[derive(Clone)]
pub struct SessionIssuer {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl SessionIssuer {
    /// Create an issuer; an empty secret is refused
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingSigningSecret` if `secret` is empty
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, SettingsError> {
        if secret.iter().all(u8::is_ascii_whitespace) {
            return Err(SettingsError::MissingSigningSecret);
        }
        Ok(Self {
            secret: secret.to_vec(),
            lifetime,
        })
    }

    /// Build the issuer from validated settings
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is missing or the session
    /// duration does not fit a `Duration`
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, SettingsError> {
        let lifetime = i64::try_from(settings.session.session_duration_days)
            .ok()
            .and_then(Duration::try_days)
            .ok_or_else(|| {
                SettingsError::Invalid("session_duration_days is out of range".to_string())
            })?;
        Self::new(settings.session.session_secret.as_bytes(), lifetime)
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a credential for `profile` starting now
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be serialized or signed
    pub fn issue(&self, profile: &ProviderProfile) -> Result<IssuedSession, SessionError> {
        self.issue_at(profile, Utc::now())
    }

    /// Issue a credential for `profile` as of `issued_at`, truncated to whole
    /// seconds so the credential equals what `verify` later decodes
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry overflows, or the credential cannot be
    /// serialized or signed
    pub fn issue_at(
        &self,
        profile: &ProviderProfile,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let issued_at = issued_at.trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| SessionError::Signing("session expiry is out of range".to_string()))?;
        let credential = SessionCredential::from_profile(profile, issued_at, expires_at);
        let token = self.sign(&credential)?;
        Ok(IssuedSession { credential, token })
    }

    /// Encode and sign a credential as `header.payload.signature`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or HMAC keying fails
    pub fn sign(&self, credential: &SessionCredential) -> Result<String, SessionError> {
        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let header_json =
            serde_json::to_vec(&header).map_err(|e| SessionError::Signing(e.to_string()))?;
        let payload_json =
            serde_json::to_vec(credential).map_err(|e| SessionError::Signing(e.to_string()))?;

        let message = format!(
            "{}.{}",
            encode_segment(&header_json),
            encode_segment(&payload_json)
        );
        let signature = hmac_sha256_sign(message.as_bytes(), &self.secret)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        Ok(format!("{message}.{}", encode_segment(&signature)))
    }

    /// Verify a token against the current time
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, the signature does not
    /// match, or the credential has expired
    pub fn verify(&self, token: &str) -> Result<SessionCredential, SessionError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`. The signature is checked before any claim is trusted.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, the signature does not
    /// match, or the credential has expired at `now`
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionCredential, SessionError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::Malformed);
        };

        let signature = decode_segment(signature_b64).map_err(|_| SessionError::Malformed)?;
        let message = format!("{header_b64}.{payload_b64}");
        if !hmac_sha256_verify(message.as_bytes(), &signature, &self.secret) {
            return Err(SessionError::InvalidSignature);
        }

        let header: serde_json::Value = decode_segment(header_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(SessionError::Malformed)?;
        if header.get("alg").and_then(serde_json::Value::as_str) != Some("HS256") {
            return Err(SessionError::UnsupportedAlgorithm);
        }

        let credential: SessionCredential = decode_segment(payload_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(SessionError::Malformed)?;

        if credential.is_expired_at(now) {
            return Err(SessionError::Expired(credential.expires_at));
        }

        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use chrono::Timelike;

    fn profile() -> ProviderProfile {
        ProviderProfile {
            external_id: "google:1234567890".to_string(),
            email: Some("writer@example.com".to_string()),
            display_name: "Writer".to_string(),
            avatar_url: Some("https://lh3.example/photo.jpg".to_string()),
            provider: Provider::Google,
        }
    }

    fn issuer(secret: &str) -> SessionIssuer {
        SessionIssuer::new(secret.as_bytes(), Duration::days(30)).unwrap()
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            SessionIssuer::new(b"", Duration::days(30)),
            Err(SettingsError::MissingSigningSecret)
        ));
        assert!(SessionIssuer::new(b"  ", Duration::days(30)).is_err());
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer("s1");
        let issued = issuer.issue(&profile()).unwrap();

        assert_eq!(issued.token.split('.').count(), 3);
        assert_eq!(
            issued.credential.expires_at - issued.credential.issued_at,
            Duration::days(30)
        );

        let verified = issuer.verify(&issued.token).unwrap();
        assert_eq!(verified.external_id, "google:1234567890");
        assert_eq!(verified.email.as_deref(), Some("writer@example.com"));
        assert_eq!(verified.provider, Provider::Google);
        assert_eq!(verified, issued.credential);
    }

    #[test]
    fn test_sub_second_issue_time_matches_verified_credential() {
        let issuer = issuer("s1");
        let issued_at = Utc::now().with_nanosecond(667_680_145).unwrap();
        let issued = issuer.issue_at(&profile(), issued_at).unwrap();

        assert_eq!(issued.credential.issued_at.timestamp_subsec_nanos(), 0);
        let verified = issuer.verify_at(&issued.token, issued_at).unwrap();
        assert_eq!(verified, issued.credential);
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let issuer = SessionIssuer::new(b"s1", Duration::days(1_000_000_000)).unwrap();
        assert!(matches!(
            issuer.issue(&profile()),
            Err(SessionError::Signing(_))
        ));
    }

    #[test]
    fn test_from_settings_rejects_unrepresentable_duration() {
        let mut settings = AuthSettings::default();
        settings.session.session_secret = "s1".to_string();
        settings.session.session_duration_days = u64::MAX;
        assert!(matches!(
            SessionIssuer::from_settings(&settings),
            Err(SettingsError::Invalid(_))
        ));

        settings.session.session_duration_days = 200_000_000_000;
        assert!(SessionIssuer::from_settings(&settings).is_err());

        settings.session.session_duration_days = 14;
        let issuer = SessionIssuer::from_settings(&settings).unwrap();
        assert_eq!(issuer.lifetime(), Duration::days(14));
    }

    #[test]
    fn test_issue_is_deterministic_for_fixed_time() {
        let issuer = issuer("s1");
        let now = Utc::now();
        let a = issuer.issue_at(&profile(), now).unwrap();
        let b = issuer.issue_at(&profile(), now).unwrap();
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let issued = issuer("s1").issue(&profile()).unwrap();
        assert!(matches!(
            issuer("s2").verify(&issued.token),
            Err(SessionError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_fails_even_with_valid_signature() {
        let issuer = issuer("s1");
        let issued_at = Utc::now() - Duration::days(31);
        let issued = issuer.issue_at(&profile(), issued_at).unwrap();

        assert!(matches!(
            issuer.verify(&issued.token),
            Err(SessionError::Expired(_))
        ));
        // Still valid the moment before expiry
        assert!(issuer
            .verify_at(&issued.token, issued.credential.expires_at - Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let issuer = issuer("s1");
        let issued = issuer.issue(&profile()).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        let mut forged = issued.credential.clone();
        forged.external_id = "google:admin".to_string();
        let forged_payload = encode_segment(&serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{forged_payload}.{}", parts[0], parts[2]);

        assert!(matches!(
            issuer.verify(&forged_token),
            Err(SessionError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let issuer = issuer("s1");
        for token in ["", "abc", "a.b", "a.b.c.d", "a.b.!!!"] {
            assert!(issuer.verify(token).is_err(), "token {token:?} should fail");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", issuer("very-secret-value"));
        assert!(!rendered.contains("very-secret-value"));
    }
}
