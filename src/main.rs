#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use justdone_auth::{
    configure_services, settings::AuthSettings, utils::crypto::StateTokenGenerator,
    CallbackOrchestrator, ProviderRegistry, VERSION,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml, .env and environment variables.
    // A missing signing secret stops startup here.
    let settings = AuthSettings::load().context("Failed to load settings")?;
    settings
        .init_logging()
        .context("Failed to initialize logging")?;

    // No CSPRNG, no service
    let state_generator =
        StateTokenGenerator::new().context("Secure random source unavailable")?;

    let registry =
        ProviderRegistry::from_settings(&settings).context("Failed to initialize OAuth providers")?;
    let orchestrator = CallbackOrchestrator::from_settings(&settings, registry, state_generator)
        .context("Failed to initialize session issuer")?;

    start_server(orchestrator, settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if binding the listen address fails or the server stops with an error
async fn start_server(
    orchestrator: CallbackOrchestrator,
    settings: AuthSettings,
) -> anyhow::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings, &orchestrator);

    let cors_origins = settings.get_cors_origins();
    let orchestrator = web::Data::new(orchestrator);

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(orchestrator.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server error")
}

fn print_startup_info(
    bind_address: &str,
    settings: &AuthSettings,
    orchestrator: &CallbackOrchestrator,
) {
    println!("Starting JustDone auth service v{VERSION} on http://{bind_address}");
    println!(
        "Environment: {}",
        if settings.is_production() {
            "production"
        } else {
            "development"
        }
    );
    println!("Base URL: {}", settings.base_url());
    println!();
    println!("OAuth2 endpoints:");
    println!("  GET  /auth/{{provider}}           - Start login (sets oauth_state)");
    println!("  GET  /auth/{{provider}}/callback  - Provider callback");
    println!("  GET|POST /auth/logout          - Clear session");
    println!("  GET  /auth/me                  - Current session");
    println!();
    println!("Callback URLs to register with identity providers:");
    for name in orchestrator.registry().enabled_providers() {
        if let Ok(provider) = name.parse() {
            println!("  {name}: {}", settings.callback_url(provider));
        }
    }
    println!();
    println!("System endpoints:");
    println!("  GET  /ping                     - Health check");
}
