use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),
    // Same message for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
