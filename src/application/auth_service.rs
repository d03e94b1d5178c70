use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::security::{PasswordEncoder, TokenClaims, TokenIssuer};
use crate::domain::user::{AuthResponse, LoginRequest, NewUser, SignupRequest, User};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Signup, login and password update over injected collaborators.
///
/// Holds no mutable state, so one instance can serve concurrent requests.
pub struct AuthService<R, E, T>
where
    R: UserRepository,
    E: PasswordEncoder,
    T: TokenIssuer,
{
    user_repository: Arc<R>,
    password_encoder: Arc<E>,
    token_issuer: Arc<T>,
}

impl<R, E, T> AuthService<R, E, T>
where
    R: UserRepository,
    E: PasswordEncoder,
    T: TokenIssuer,
{
    pub fn new(user_repository: Arc<R>, password_encoder: Arc<E>, token_issuer: Arc<T>) -> Self {
        Self {
            user_repository,
            password_encoder,
            token_issuer,
        }
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.user_repository
            .find_by_email(email)
            .await
            .map_err(|e| storage_failure("look up user", e))
    }

    #[instrument(skip(self, req), fields(email = %req.email, role = %req.role))]
    pub async fn signup(&self, req: SignupRequest) -> Result<AuthResponse, DomainError> {
        trace!("Starting signup");

        let exists = self
            .user_repository
            .exists_by_email(&req.email)
            .await
            .map_err(|e| storage_failure("check email", e))?;
        if exists {
            warn!(email = %req.email, "Account already exists");
            return Err(DomainError::DuplicateAccount(req.email));
        }

        let password_hash = self.password_encoder.encode(&req.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let new_user = NewUser::new(req.full_name, req.email, password_hash, req.role);
        debug!(email = %new_user.email, "Saving new user");
        let user = self
            .user_repository
            .save_and_flush(new_user)
            .await
            .map_err(|e| match e.downcast::<DomainError>() {
                // Lost a race against a concurrent signup for the same email.
                Ok(DomainError::DuplicateAccount(email)) => {
                    warn!(email = %email, "Account created concurrently");
                    DomainError::DuplicateAccount(email)
                }
                Ok(other) => other,
                Err(e) => storage_failure("save user", e),
            })?;

        let token = match self.issue_token(&user) {
            Ok(token) => token,
            Err(e) => {
                // Signup must not leave an account the caller never got a token for.
                if let Err(rollback) = self.user_repository.delete(user.id).await {
                    error!(
                        user_id = user.id,
                        error = %rollback,
                        "Failed to remove user after token failure"
                    );
                }
                return Err(e);
            }
        };

        info!(user_id = user.id, email = %user.email, "User signed up successfully");
        Ok(AuthResponse::new(user, token))
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, DomainError> {
        trace!("Starting login");

        let user = self
            .user_repository
            .find_by_email(&req.email)
            .await
            .map_err(|e| storage_failure("look up user", e))?
            .ok_or_else(|| {
                warn!(email = %req.email, "User not found during login");
                self.password_encoder.simulate_matches(&req.password);
                DomainError::InvalidCredentials
            })?;

        if !self
            .password_encoder
            .matches(&req.password, &user.password_hash)
        {
            warn!(user_id = user.id, email = %user.email, "Invalid password during login");
            return Err(DomainError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;

        info!(user_id = user.id, email = %user.email, "Login successful");
        Ok(AuthResponse::new(user, token))
    }

    /// Replaces the stored hash. An unknown email is a silent no-op.
    #[instrument(skip(self, new_password))]
    pub async fn update_password(&self, email: &str, new_password: &str) -> Result<(), DomainError> {
        let Some(user) = self
            .user_repository
            .find_by_email(email)
            .await
            .map_err(|e| storage_failure("look up user", e))?
        else {
            debug!(email = email, "No account for email, skipping password update");
            return Ok(());
        };

        let password_hash = self.password_encoder.encode(new_password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let user = self
            .user_repository
            .save(user.with_password_hash(password_hash))
            .await
            .map_err(|e| storage_failure("save user", e))?;

        info!(user_id = user.id, email = %user.email, "Password updated");
        Ok(())
    }

    fn issue_token(&self, user: &User) -> Result<String, DomainError> {
        let mut claims = TokenClaims::new();
        claims.insert("role".to_string(), json!(user.role.as_str()));
        claims.insert("user_id".to_string(), json!(user.id));

        self.token_issuer
            .generate_token(&user.email, &claims)
            .map_err(|e| {
                error!(error = %e, "Failed to generate token");
                DomainError::Internal(format!("Failed to generate token: {}", e))
            })
    }
}

fn storage_failure(action: &str, e: anyhow::Error) -> DomainError {
    error!(error = %e, action = action, "User storage failed");
    DomainError::Internal(format!("Failed to {}: {}", action, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user_repository::InMemoryUserRepository;
    use crate::domain::repository::MockUserRepository;
    use crate::domain::security::{MockPasswordEncoder, MockTokenIssuer};
    use crate::domain::user::Role;
    use mockall::predicate::eq;

    type TestAuthService = AuthService<MockUserRepository, MockPasswordEncoder, MockTokenIssuer>;

    fn service(
        repo: MockUserRepository,
        encoder: MockPasswordEncoder,
        issuer: MockTokenIssuer,
    ) -> TestAuthService {
        AuthService::new(Arc::new(repo), Arc::new(encoder), Arc::new(issuer))
    }

    fn stored_user() -> User {
        User {
            id: 1,
            full_name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            password_hash: "hashedSecurePass".to_string(),
            role: Role::Student,
        }
    }

    fn issuer_returning(subject: &'static str, token: &'static str) -> MockTokenIssuer {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_generate_token()
            .withf(move |s, claims| {
                s == subject && claims.get("role") == Some(&json!("STUDENT"))
            })
            .times(1)
            .returning(move |_, _| Ok(token.to_string()));
        issuer
    }

    #[tokio::test]
    async fn test_find_by_email_returns_stored_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("john@example.com"))
            .returning(|_| Ok(Some(stored_user())));

        let service = service(repo, MockPasswordEncoder::new(), MockTokenIssuer::new());

        let first = service.find_by_email("john@example.com").await.unwrap();
        let second = service.find_by_email("john@example.com").await.unwrap();
        assert_eq!(first.as_ref().map(|u| u.email.as_str()), Some("john@example.com"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_find_by_email_returns_none_for_unknown_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));

        let service = service(repo, MockPasswordEncoder::new(), MockTokenIssuer::new());

        let result = service.find_by_email("missing@example.com").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_password_saves_new_hash_once() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("test@example.com"))
            .returning(|_| {
                Ok(Some(User {
                    email: "test@example.com".to_string(),
                    password_hash: "oldPassword".to_string(),
                    ..stored_user()
                }))
            });
        repo.expect_save()
            .withf(|user| {
                user.email == "test@example.com" && user.password_hash == "hashedNewPassword"
            })
            .times(1)
            .returning(|user| Ok(user));

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .with(eq("newPassword"))
            .times(1)
            .returning(|_| Ok("hashedNewPassword".to_string()));

        let service = service(repo, encoder, MockTokenIssuer::new());

        service
            .update_password("test@example.com", "newPassword")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_password_unknown_email_is_noop() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("missing@example.com"))
            .returning(|_| Ok(None));
        repo.expect_save().never();

        let mut encoder = MockPasswordEncoder::new();
        encoder.expect_encode().never();

        let service = service(repo, encoder, MockTokenIssuer::new());

        let result = service
            .update_password("missing@example.com", "newPassword")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_signup_creates_user_and_issues_token() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email()
            .with(eq("jane@example.com"))
            .times(1)
            .returning(|_| Ok(false));
        repo.expect_save_and_flush()
            .withf(|new_user| {
                new_user.full_name == "Jane Doe"
                    && new_user.email == "jane@example.com"
                    && new_user.password_hash == "hashedSecurePass"
                    && new_user.role == Role::Student
            })
            .times(1)
            .returning(|new_user| Ok(new_user.into_user(42)));

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .with(eq("securePass"))
            .times(1)
            .returning(|_| Ok("hashedSecurePass".to_string()));

        let issuer = issuer_returning("jane@example.com", "mockToken");

        let service = service(repo, encoder, issuer);

        let response = service
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await
            .unwrap();

        assert_eq!(response.id, 42);
        assert_eq!(response.email, "jane@example.com");
        assert_eq!(response.full_name, "Jane Doe");
        assert_eq!(response.role, Role::Student);
        assert_eq!(response.token, "mockToken");
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_saves_nothing() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(true));
        repo.expect_save_and_flush().never();

        let mut encoder = MockPasswordEncoder::new();
        encoder.expect_encode().never();

        let mut issuer = MockTokenIssuer::new();
        issuer.expect_generate_token().never();

        let service = service(repo, encoder, issuer);

        let result = service
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::DuplicateAccount(ref email)) if email == "jane@example.com"
        ));
    }

    #[tokio::test]
    async fn test_signup_race_reported_as_duplicate() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(false));
        repo.expect_save_and_flush().returning(|new_user| {
            Err(DomainError::DuplicateAccount(new_user.email).into())
        });

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .returning(|_| Ok("hashedSecurePass".to_string()));

        let mut issuer = MockTokenIssuer::new();
        issuer.expect_generate_token().never();

        let service = service(repo, encoder, issuer);

        let result = service
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await;

        assert!(matches!(result, Err(DomainError::DuplicateAccount(_))));
    }

    #[tokio::test]
    async fn test_signup_storage_failure_is_internal() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        repo.expect_save_and_flush().never();

        let service = service(repo, MockPasswordEncoder::new(), MockTokenIssuer::new());

        let result = service
            .signup(SignupRequest::new("Jane Doe", "jane@example.com", "pw", Role::Student))
            .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
    }

    #[tokio::test]
    async fn test_signup_save_failure_is_internal_and_issues_no_token() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(false));
        repo.expect_save_and_flush()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        repo.expect_delete().never();

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .returning(|_| Ok("hashedSecurePass".to_string()));

        let mut issuer = MockTokenIssuer::new();
        issuer.expect_generate_token().never();

        let service = service(repo, encoder, issuer);

        let result = service
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
    }

    #[tokio::test]
    async fn test_signup_token_failure_removes_saved_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(false));
        repo.expect_save_and_flush()
            .returning(|new_user| Ok(new_user.into_user(42)));
        repo.expect_delete()
            .with(eq(42))
            .times(1)
            .returning(|_| Ok(()));

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .returning(|_| Ok("hashedSecurePass".to_string()));

        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_generate_token()
            .returning(|_, _| Err(anyhow::anyhow!("signer down")));

        let service = service(repo, encoder, issuer);

        let result = service
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
    }

    #[tokio::test]
    async fn test_signup_token_failure_leaves_store_empty_and_retry_succeeds() {
        let repo = Arc::new(InMemoryUserRepository::new());

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .returning(|_| Ok("hashedSecurePass".to_string()));

        let mut failing_issuer = MockTokenIssuer::new();
        failing_issuer
            .expect_generate_token()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("signer down")));

        let failing = AuthService::new(repo.clone(), Arc::new(encoder), Arc::new(failing_issuer));
        let result = failing
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
        assert_eq!(repo.len().await, 0);

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .returning(|_| Ok("hashedSecurePass".to_string()));
        let working = AuthService::new(
            repo.clone(),
            Arc::new(encoder),
            Arc::new(issuer_returning("jane@example.com", "mockToken")),
        );

        let response = working
            .signup(SignupRequest::new(
                "Jane Doe",
                "jane@example.com",
                "securePass",
                Role::Student,
            ))
            .await
            .unwrap();

        assert_eq!(response.token, "mockToken");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_login_returns_user_metadata_and_token() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("john@example.com"))
            .times(1)
            .returning(|_| Ok(Some(stored_user())));

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_matches()
            .with(eq("securePass"), eq("hashedSecurePass"))
            .times(1)
            .returning(|_, _| true);

        let issuer = issuer_returning("john@example.com", "mockToken");

        let service = service(repo, encoder, issuer);

        let response = service
            .login(LoginRequest::new("john@example.com", "securePass"))
            .await
            .unwrap();

        assert_eq!(response.id, 1);
        assert_eq!(response.full_name, "John Doe");
        assert_eq!(response.email, "john@example.com");
        assert_eq!(response.role, Role::Student);
        assert_eq!(response.token, "mockToken");
    }

    #[tokio::test]
    async fn test_login_unknown_email_and_wrong_password_are_indistinguishable() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("nobody@example.com"))
            .returning(|_| Ok(None));
        repo.expect_find_by_email()
            .with(eq("john@example.com"))
            .returning(|_| Ok(Some(stored_user())));

        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_matches()
            .with(eq("wrongPass"), eq("hashedSecurePass"))
            .times(1)
            .returning(|_, _| false);
        // Unknown email still pays for a hash verification.
        encoder
            .expect_simulate_matches()
            .with(eq("securePass"))
            .times(1)
            .return_const(());

        let mut issuer = MockTokenIssuer::new();
        issuer.expect_generate_token().never();

        let service = service(repo, encoder, issuer);

        let unknown = service
            .login(LoginRequest::new("nobody@example.com", "securePass"))
            .await
            .unwrap_err();
        let wrong = service
            .login(LoginRequest::new("john@example.com", "wrongPass"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, DomainError::InvalidCredentials));
        assert!(matches!(wrong, DomainError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_token_failure_is_internal() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(stored_user())));

        let mut encoder = MockPasswordEncoder::new();
        encoder.expect_matches().returning(|_, _| true);

        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_generate_token()
            .returning(|_, _| Err(anyhow::anyhow!("signing key unavailable")));

        let service = service(repo, encoder, issuer);

        let result = service
            .login(LoginRequest::new("john@example.com", "securePass"))
            .await;
        assert!(matches!(result, Err(DomainError::Internal(_))));
    }
}
