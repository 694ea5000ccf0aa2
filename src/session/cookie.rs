use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::settings::AuthSettings;

/// Common cookie names used across the application
pub const SESSION_COOKIE: &str = "session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: CookieDuration,
    pub domain: Option<String>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: CookieDuration::hours(24),
            domain: None,
        }
    }
}

/// Cookie factory for the two browser-held values of the login flow
///
/// Production posture sets `Secure` on every cookie and relaxes the session
/// cookie to `SameSite=None` so a front-end on another origin can send it.
#[derive(Clone, Debug)]
pub struct CookieFactory {
    production: bool,
    domain: Option<String>,
    session_max_age: CookieDuration,
    state_max_age: CookieDuration,
}

impl CookieFactory {
    #[must_use]
    pub fn new(
        production: bool,
        domain: Option<String>,
        session_max_age: CookieDuration,
        state_max_age: CookieDuration,
    ) -> Self {
        Self {
            production,
            domain,
            session_max_age,
            state_max_age,
        }
    }

    /// Build the factory from settings; the session cookie lives as long as
    /// the signed credential it carries
    #[must_use]
    pub fn from_settings(settings: &AuthSettings, session_lifetime: chrono::Duration) -> Self {
        let minutes = i64::try_from(settings.session.state_ttl_minutes).unwrap_or(10);
        Self::new(
            settings.is_production(),
            settings.cookies.domain.clone(),
            CookieDuration::seconds(session_lifetime.num_seconds()),
            CookieDuration::minutes(minutes),
        )
    }

    /// Build a cookie with the factory's `Secure` posture
    #[must_use]
    pub fn create_cookie(
        &self,
        name: &str,
        value: String,
        options: CookieOptions,
    ) -> Cookie<'static> {
        let mut builder = Cookie::build(name.to_owned(), value)
            .http_only(options.http_only)
            .secure(self.production)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age);
        if let Some(domain) = options.domain {
            builder = builder.domain(domain);
        }
        builder.finish()
    }

    /// Short-lived cookie correlating the provider callback with this browser
    #[must_use]
    pub fn create_state_cookie(&self, state: &str) -> Cookie<'static> {
        let cookie = self.create_cookie(
            OAUTH_STATE_COOKIE,
            state.to_owned(),
            CookieOptions {
                same_site: SameSite::Lax,
                max_age: self.state_max_age,
                ..Default::default()
            },
        );
        log::debug!(
            "Creating state cookie: secure={}, max_age={}s",
            self.production,
            self.state_max_age.whole_seconds()
        );
        cookie
    }

    /// Session cookie carrying the signed credential
    #[must_use]
    pub fn create_session_cookie(&self, token: &str) -> Cookie<'static> {
        let same_site = if self.production {
            SameSite::None
        } else {
            SameSite::Lax
        };
        self.create_cookie(
            SESSION_COOKIE,
            token.to_owned(),
            CookieOptions {
                same_site,
                max_age: self.session_max_age,
                domain: self.domain.clone(),
                ..Default::default()
            },
        )
    }

    /// Expired `oauth_state` cookie, sent once the state has been consumed
    #[must_use]
    pub fn create_expired_state_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(OAUTH_STATE_COOKIE, self.production, None)
    }

    /// Expired `session` cookie, used on logout
    #[must_use]
    pub fn create_expired_session_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(SESSION_COOKIE, self.production, self.domain.clone())
    }
}

/// Helper function to extract a non-empty cookie value from `HttpRequest`
#[must_use]
pub fn extract_cookie_value(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.cookie(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool, domain: Option<String>) -> Cookie<'static> {
    let mut builder = Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(CookieDuration::seconds(-1));
    if let Some(domain) = domain {
        builder = builder.domain(domain);
    }
    builder.finish()
}
