use crate::domain::error::DomainError;
use crate::domain::user::{LoginRequest, SignupRequest, UpdatePasswordRequest};
use crate::presentation::handlers::{ApiError, AppState};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use tracing::{error, info, instrument};

fn require_non_blank(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{} must not be blank", field)));
    }
    Ok(())
}

fn validate_signup(req: &SignupRequest) -> Result<(), DomainError> {
    require_non_blank("full_name", &req.full_name)?;
    require_non_blank("email", &req.email)?;
    require_non_blank("password", &req.password)?;
    if !req.email.contains('@') {
        return Err(DomainError::Validation("email is not valid".to_string()));
    }
    Ok(())
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Signup request received");
    let req = req.into_inner();
    validate_signup(&req)?;

    let response = state.auth_service.signup(req).await.map_err(|e| {
        error!(error = %e, "Failed to sign up");
        ApiError::from(e)
    })?;

    info!(user_id = response.id, "Signup completed");
    Ok(HttpResponse::Created().json(response))
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let response = state
        .auth_service
        .login(req.into_inner())
        .await
        .map_err(ApiError::from)?;

    info!(user_id = response.id, "Login completed");
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state, user, req), fields(email = %user.email))]
pub async fn update_password(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<UpdatePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Password update request received");
    require_non_blank("new_password", &req.new_password)?;

    state
        .auth_service
        .update_password(&user.email, &req.new_password)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to update password");
            ApiError::from(e)
        })?;

    Ok(HttpResponse::NoContent().finish())
}
