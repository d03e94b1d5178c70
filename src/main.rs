use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use credential_service::application::auth_service::AuthService;
use credential_service::configure;
use credential_service::data::user_repository::InMemoryUserRepository;
use credential_service::infrastructure::config::AppConfig;
use credential_service::infrastructure::logging::init_logging;
use credential_service::infrastructure::security::{Argon2PasswordEncoder, JwtTokenIssuer};
use credential_service::presentation::handlers::AppState;
use credential_service::presentation::middleware::RequestTracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(config = ?config, "Configuration loaded");

    let user_repository = Arc::new(InMemoryUserRepository::new());
    let password_encoder = Arc::new(Argon2PasswordEncoder::new()?);
    let token_issuer = Arc::new(JwtTokenIssuer::new(
        &config.jwt_secret,
        config.token_ttl_secs,
    ));

    let auth_service = AuthService::new(user_repository, password_encoder, token_issuer.clone());
    let state = web::Data::new(AppState {
        auth_service: Arc::new(auth_service),
        token_issuer,
    });
    info!("Auth service created");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(RequestTracing)
            .wrap(Cors::permissive())
            .configure(configure)
    });

    let bind_addr = (config.server_host.clone(), config.server_port);
    let server = server
        .bind(bind_addr.clone())
        .with_context(|| format!("Failed to bind {}:{}", bind_addr.0, bind_addr.1))?;

    info!(
        host = %bind_addr.0,
        port = bind_addr.1,
        routes = %"GET /api/health, POST /api/auth/signup, POST /api/auth/login, PUT /api/auth/password",
        "Starting HTTP server"
    );
    server.run().await?;
    Ok(())
}
