//! User accounts and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::{AdminConfig, AuthConfig},
    error::{AppError, AppResult, ErrorCode},
    models::user::{RegisterUser, User, UserClaims, UserQuery, UserRole, UserStatus},
    policy::{self, TransitionDecision},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new member account. New accounts await admin verification.
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = self.hash_password(&request.password)?;

        let user = self
            .repository
            .users
            .create(
                &request.email,
                &password_hash,
                &request.full_name,
                request.student_id_number.as_deref(),
                UserRole::Member.as_str(),
                UserStatus::PendingVerification,
            )
            .await?;

        tracing::info!(user_id = %user.id, "user registered");

        Ok(user)
    }

    /// Ensure the bootstrap administrator account exists.
    ///
    /// Idempotent: a fresh database gets an Active admin so verification and
    /// catalog management are reachable, an existing account is left alone.
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<()> {
        if self.repository.users.email_exists(&admin.email).await? {
            return Ok(());
        }

        let password_hash = self.hash_password(&admin.password)?;

        let user = self
            .repository
            .users
            .create(
                &admin.email,
                &password_hash,
                &admin.full_name,
                None,
                UserRole::Admin.as_str(),
                UserStatus::Active,
            )
            .await?;

        tracing::info!(user_id = %user.id, email = %admin.email, "admin account seeded");

        Ok(())
    }

    /// Authenticate by email and password, returning a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.parsed_role(),
            exp,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, user))
    }

    /// Get a user by id
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users (admin listing). Defaults to the verification queue.
    pub async fn search_users(&self, mut query: UserQuery) -> AppResult<Vec<User>> {
        if query.status.as_deref().map_or(true, str::is_empty) {
            query.status = Some(UserStatus::PendingVerification.as_str().to_string());
        }
        self.repository.users.search(&query).await
    }

    /// Change a user's account status, enforcing the transition table.
    ///
    /// The current status is read fresh from the store and the mutation is
    /// only persisted when the guard allows the pair.
    pub async fn change_status(&self, id: Uuid, requested: UserStatus) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id).await?;
        let current = user.parsed_status();

        match policy::evaluate_transition(current, requested) {
            TransitionDecision::Allow => {
                let updated = self.repository.users.set_status(id, requested).await?;
                tracing::info!(
                    user_id = %id,
                    from = %user.status,
                    to = %requested,
                    "user status changed"
                );
                Ok(updated)
            }
            TransitionDecision::Deny { reason } => {
                let code = if current.is_none() {
                    ErrorCode::UnknownStatus
                } else {
                    ErrorCode::IllegalTransition
                };
                Err(AppError::BusinessRule(code, reason))
            }
        }
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
