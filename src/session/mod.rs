//! Session issuance and the cookies that carry it
//!
//! - [`issuer`] - HS256 signing and verification of `SessionCredential`s
//! - [`cookie`] - `oauth_state` and `session` cookie construction

pub mod cookie;
pub mod issuer;

pub use cookie::{CookieFactory, OAUTH_STATE_COOKIE, SESSION_COOKIE};
pub use issuer::{IssuedSession, SessionError, SessionIssuer};
