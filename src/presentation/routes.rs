use crate::presentation::auth::{login, signup, update_password};
use crate::presentation::handlers::health_check;
use actix_web::web;

/// Mounts every route under `/api`. Expects `web::Data<AppState>` to be
/// registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/login", web::post().to(login))
            .route("/auth/password", web::put().to(update_password)),
    );
}
