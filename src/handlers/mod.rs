// HTTP request handlers for the login flow
pub mod health;
pub mod oauth;

#[cfg(test)]
mod tests;

use actix_web::web;

pub use health::health;
pub use oauth::{oauth_callback, oauth_sign_in, oauth_sign_out, oauth_userinfo};

/// Register every route. Fixed `/auth/*` paths come before `/auth/{provider}`.
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/ping", web::get().to(health))
        .route("/auth/me", web::get().to(oauth_userinfo))
        .route("/auth/logout", web::get().to(oauth_sign_out))
        .route("/auth/logout", web::post().to(oauth_sign_out))
        .route("/auth/{provider}", web::get().to(oauth_sign_in))
        .route("/auth/{provider}/callback", web::get().to(oauth_callback));
}
