use actix_web::{cookie::Cookie, http::header, http::StatusCode, HttpResponse};
use serde_json::json;

use crate::oauth::FlowError;

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a redirect response with optional cookies
    #[must_use]
    pub fn redirect(location: &str, cookies: Option<Vec<Cookie<'static>>>) -> HttpResponse {
        let mut builder = HttpResponse::Found();

        if let Some(cookies_vec) = cookies {
            for cookie in cookies_vec {
                builder.cookie(cookie);
            }
        }

        builder
            .append_header((header::LOCATION, location))
            .finish()
    }

    /// Create a success redirect response with multiple cookies
    #[must_use]
    pub fn success_redirect_with_cookies(
        location: &str,
        cookies: Vec<Cookie<'static>>,
    ) -> HttpResponse {
        Self::redirect(location, Some(cookies))
    }

    /// Plain-text response, optionally clearing cookies
    #[must_use]
    pub fn plain_text(
        status: StatusCode,
        message: &str,
        cookies: Vec<Cookie<'static>>,
    ) -> HttpResponse {
        let mut builder = HttpResponse::build(status);
        for cookie in cookies {
            builder.cookie(cookie);
        }
        builder
            .content_type("text/plain; charset=utf-8")
            .body(message.to_owned())
    }

    /// Map a failed login attempt to its response. Only the generic user
    /// message is rendered; details stay in the server log.
    #[must_use]
    pub fn flow_error(error: &FlowError, cookies: Vec<Cookie<'static>>) -> HttpResponse {
        Self::plain_text(error.status_code(), error.user_message(), cookies)
    }

    /// JSON 401 for requests without a valid session
    #[must_use]
    pub fn unauthorized() -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({
            "error": "unauthorized",
            "error_description": "Authentication is required to access this resource"
        }))
    }
}
