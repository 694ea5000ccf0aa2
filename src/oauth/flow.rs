//! Per-request login state machine.
//!
//! ```text
//! START -> REDIRECTED -> CALLBACK_RECEIVED -> STATE_VALIDATED -> EXCHANGED
//!       -> SESSION_ISSUED -> DONE
//! ```
//!
//! `REJECTED` (CSRF mismatch) and `FAILED` (any downstream error) are terminal.
//! No state lives in the process between requests; the only carried values
//! are the `oauth_state` and `session` cookies.

use std::fmt;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use log::{debug, error, info};
use thiserror::Error;
use url::Url;

use super::{OAuthCallback, OAuthError, ProviderAdapter, ProviderRegistry};
use crate::models::{LoginAttempt, Provider, SessionCredential};
use crate::session::{CookieFactory, SessionError, SessionIssuer};
use crate::settings::{AuthSettings, SettingsError};
use crate::utils::crypto::{constant_time_eq, StateTokenGenerator};
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    Redirected,
    CallbackReceived,
    StateValidated,
    Exchanged,
    SessionIssued,
    Done,
    Rejected,
    Failed,
}

impl FlowState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Done | FlowState::Rejected | FlowState::Failed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Start => "START",
            FlowState::Redirected => "REDIRECTED",
            FlowState::CallbackReceived => "CALLBACK_RECEIVED",
            FlowState::StateValidated => "STATE_VALIDATED",
            FlowState::Exchanged => "EXCHANGED",
            FlowState::SessionIssued => "SESSION_ISSUED",
            FlowState::Done => "DONE",
            FlowState::Rejected => "REJECTED",
            FlowState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Reasons a login attempt ends without a session
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("provider '{0}' is not enabled")]
    ProviderDisabled(String),
    #[error("OAuth state mismatch")]
    CsrfStateMismatch,
    #[error(
        "callback for {provider} carried no authorization code (provider error: {})",
        .error.as_deref().unwrap_or("none")
    )]
    MissingCode {
        provider: Provider,
        error: Option<String>,
    },
    #[error(transparent)]
    Provider(#[from] OAuthError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FlowError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            FlowError::ProviderDisabled(_) => StatusCode::NOT_FOUND,
            FlowError::CsrfStateMismatch => StatusCode::FORBIDDEN,
            FlowError::MissingCode { .. } | FlowError::Provider(_) | FlowError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text shown to the browser. Never includes provider responses.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            FlowError::ProviderDisabled(_) => "Login provider not available",
            FlowError::CsrfStateMismatch => {
                "Invalid or expired login attempt. Please go back and try signing in again."
            }
            FlowError::MissingCode { .. } | FlowError::Provider(_) | FlowError::Session(_) => {
                "Authentication failed. Please try signing in again."
            }
        }
    }

    /// Terminal state this error leaves the attempt in
    #[must_use]
    pub fn terminal_state(&self) -> FlowState {
        match self {
            FlowError::CsrfStateMismatch => FlowState::Rejected,
            _ => FlowState::Failed,
        }
    }
}

/// Result of `START`: where to send the browser and the cookie binding the attempt to it
#[derive(Debug)]
pub struct StartedLogin {
    pub attempt: LoginAttempt,
    pub authorization_url: Url,
    pub state_cookie: Cookie<'static>,
}

/// Result of a successful callback
#[derive(Debug)]
pub struct CompletedLogin {
    pub credential: SessionCredential,
    pub session_cookie: Cookie<'static>,
    pub clear_state_cookie: Cookie<'static>,
    pub redirect_to: String,
}

/// Ties the state generator, provider adapters and session issuer together
/// for one login attempt per request.
#[derive(Clone, Debug)]
pub struct CallbackOrchestrator {
    registry: ProviderRegistry,
    issuer: SessionIssuer,
    cookies: CookieFactory,
    state_generator: StateTokenGenerator,
    post_login_redirect: String,
}

impl CallbackOrchestrator {
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        issuer: SessionIssuer,
        cookies: CookieFactory,
        state_generator: StateTokenGenerator,
        post_login_redirect: String,
    ) -> Self {
        Self {
            registry,
            issuer,
            cookies,
            state_generator,
            post_login_redirect,
        }
    }

    /// Assemble the orchestrator from validated settings
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is missing or out of range
    pub fn from_settings(
        settings: &AuthSettings,
        registry: ProviderRegistry,
        state_generator: StateTokenGenerator,
    ) -> Result<Self, SettingsError> {
        let issuer = SessionIssuer::from_settings(settings)?;
        let cookies = CookieFactory::from_settings(settings, issuer.lifetime());
        Ok(Self::new(
            registry,
            issuer,
            cookies,
            state_generator,
            settings.application.post_login_redirect.clone(),
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieFactory {
        &self.cookies
    }

    fn adapter(&self, provider: &str) -> Result<Arc<dyn ProviderAdapter>, FlowError> {
        self.registry
            .get(provider)
            .ok_or_else(|| FlowError::ProviderDisabled(provider.to_string()))
    }

    fn transition(provider: Provider, from: FlowState, to: FlowState) {
        debug!("[{provider}] login flow {from} -> {to}");
    }

    /// `START`: mint a state token and build the provider redirect
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ProviderDisabled` if the provider is unknown or not configured
    pub fn start(&self, provider: &str) -> Result<StartedLogin, FlowError> {
        let adapter = self.adapter(provider)?;
        let provider = adapter.provider();

        let attempt = LoginAttempt::new(self.state_generator.generate(), provider);
        let authorization_url = adapter.authorization_url(&attempt.state);
        let state_cookie = self.cookies.create_state_cookie(&attempt.state);
        Self::transition(provider, FlowState::Start, FlowState::Redirected);

        Ok(StartedLogin {
            attempt,
            authorization_url,
            state_cookie,
        })
    }

    /// Drive a provider callback from `CALLBACK_RECEIVED` to `DONE`.
    ///
    /// The CSRF check runs before the adapter is touched, so a mismatched
    /// callback never causes a request to the provider.
    ///
    /// # Errors
    ///
    /// - `FlowError::ProviderDisabled` for unknown or unconfigured providers
    /// - `FlowError::CsrfStateMismatch` if the query state and `stored_state`
    ///   are not both present and equal
    /// - `FlowError::MissingCode`, `FlowError::Provider` or `FlowError::Session`
    ///   for downstream failures
    pub async fn complete(
        &self,
        provider: &str,
        callback: &OAuthCallback,
        stored_state: Option<&str>,
    ) -> Result<CompletedLogin, FlowError> {
        let adapter = self.adapter(provider)?;
        let provider = adapter.provider();
        Self::transition(provider, FlowState::Redirected, FlowState::CallbackReceived);

        let result = self.run_callback(adapter.as_ref(), callback, stored_state).await;
        if let Err(err) = &result {
            let terminal = err.terminal_state();
            Self::transition(provider, FlowState::CallbackReceived, terminal);
            if terminal == FlowState::Failed {
                error!("❌ {provider} login failed: {err}");
            }
        }
        result
    }

    async fn run_callback(
        &self,
        adapter: &dyn ProviderAdapter,
        callback: &OAuthCallback,
        stored_state: Option<&str>,
    ) -> Result<CompletedLogin, FlowError> {
        let provider = adapter.provider();

        match (callback.state.as_deref(), stored_state) {
            (Some(received), Some(stored))
                if constant_time_eq(received.as_bytes(), stored.as_bytes()) => {}
            (received, stored) => {
                LoggingHelper::log_state_mismatch(provider, received.is_some(), stored.is_some());
                return Err(FlowError::CsrfStateMismatch);
            }
        }
        Self::transition(provider, FlowState::CallbackReceived, FlowState::StateValidated);

        let Some(code) = callback.code.as_deref().filter(|c| !c.is_empty()) else {
            return Err(FlowError::MissingCode {
                provider,
                error: callback.error.clone(),
            });
        };

        let profile = adapter.exchange_code_for_profile(code).await?;
        Self::transition(provider, FlowState::StateValidated, FlowState::Exchanged);

        let issued = self.issuer.issue(&profile)?;
        LoggingHelper::log_session_issued(&issued.credential.external_id, provider);
        Self::transition(provider, FlowState::Exchanged, FlowState::SessionIssued);

        let completed = CompletedLogin {
            session_cookie: self.cookies.create_session_cookie(&issued.token),
            clear_state_cookie: self.cookies.create_expired_state_cookie(),
            redirect_to: self.post_login_redirect.clone(),
            credential: issued.credential,
        };
        Self::transition(provider, FlowState::SessionIssued, FlowState::Done);
        info!("✅ {provider} login complete for {}", completed.credential.external_id);
        Ok(completed)
    }
}
