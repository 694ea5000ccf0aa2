#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the justdone-auth service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod models;
pub mod oauth;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::{
    configure_services, health, oauth_callback, oauth_sign_in, oauth_sign_out, oauth_userinfo,
};
pub use models::{Provider, ProviderProfile, SessionCredential};
pub use oauth::{CallbackOrchestrator, ProviderAdapter, ProviderRegistry};
pub use session::SessionIssuer;
pub use settings::AuthSettings;
