//! Request builders for exercising the login routes through `actix_web::test`

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::Method;
use actix_web::test;

use crate::session::{OAUTH_STATE_COOKIE, SESSION_COOKIE};

/// Builder for creating HTTP requests for testing
pub struct RequestBuilder {
    method: Method,
    uri: String,
    cookies: Vec<Cookie<'static>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Create a new request builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: "/".to_string(),
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    /// `GET /auth/{provider}/callback` with the given query values
    #[must_use]
    pub fn callback(provider: &str, code: Option<&str>, state: Option<&str>) -> Self {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(code) = code {
            query.append_pair("code", code);
        }
        if let Some(state) = state {
            query.append_pair("state", state);
        }
        Self::new().uri(&format!("/auth/{provider}/callback?{}", query.finish()))
    }

    #[must_use]
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(Cookie::new(name.to_owned(), value.to_owned()));
        self
    }

    /// Attach an `oauth_state` cookie
    #[must_use]
    pub fn state_cookie(self, state: &str) -> Self {
        self.cookie(OAUTH_STATE_COOKIE, state)
    }

    /// Attach a `session` cookie
    #[must_use]
    pub fn session_cookie(self, token: &str) -> Self {
        self.cookie(SESSION_COOKIE, token)
    }

    #[must_use]
    pub fn build(self) -> test::TestRequest {
        let mut req = test::TestRequest::default()
            .method(self.method)
            .uri(&self.uri);
        for cookie in self.cookies {
            req = req.cookie(cookie);
        }
        req
    }
}

/// Find a cookie set by a response
#[must_use]
pub fn response_cookie<B>(response: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    response
        .response()
        .cookies()
        .find(|c| c.name() == name)
        .map(Cookie::into_owned)
}

/// The `Location` header of a redirect
#[must_use]
pub fn location<B>(response: &ServiceResponse<B>) -> Option<String> {
    response
        .headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
