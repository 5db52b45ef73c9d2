//! Registration and login.

use std::sync::Arc;

use shelf_authz::{PasswordHasher, TokenError, TokenService};
use shelf_db::DbError;
use shelf_http::AppError;
use thiserror::Error;

use super::models::{normalize_email, User};
use super::repository::UserRepository;

/// Unknown emails are verified against a hash of this.
const DUMMY_PASSWORD: &str = "shelf-unknown-account";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("email already registered")]
    DuplicateEmail,

    /// Returned for both an unknown email and a wrong password.
    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::DuplicateEmail => {
                AppError::bad_request_with_code("duplicate_email", "Email already registered")
            }
            AccountError::InvalidCredentials => {
                AppError::bad_request_with_code("invalid_credentials", "Incorrect email or password")
            }
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
    dummy_hash: String,
}

impl AccountService {
    /// Hashes the placeholder password once at the configured cost.
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Result<Self, AccountError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            users,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    /// Emails are stored with a lowercased domain.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = normalize_email(email);
        let email = email.as_str();
        if self.users.find_by_email(email).await?.is_some() {
            tracing::warn!(email = %email, "registration rejected: email already registered");
            return Err(AccountError::DuplicateEmail);
        }

        let hasher = self.hasher;
        let password = password.to_string();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

        let user = self.users.insert(email, &hashed).await.map_err(|err| {
            if err.is_unique_violation() {
                AccountError::DuplicateEmail
            } else {
                AccountError::Storage(err)
            }
        })?;

        tracing::info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Check credentials and issue an access token with the configured lifetime.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AccountError> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?;

        let hasher = self.hasher;
        let password = password.to_string();
        let stored = match &user {
            Some(user) => user.hashed_password.clone(),
            None => self.dummy_hash.clone(),
        };
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored)).await?;

        let user = match user {
            Some(user) if valid => user,
            _ => {
                tracing::warn!(email = %email, "login rejected");
                return Err(AccountError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue_access_token(&user.email)?;
        tracing::info!(user_id = user.id, "access token issued");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::users::repository::SqliteUserRepository;
    use crate::test_support::migrated_database;
    use chrono::Duration;

    async fn service() -> (AccountService, Arc<TokenService>, tempfile::TempDir) {
        let (db, dir) = migrated_database().await;
        let tokens = Arc::new(TokenService::new("service-secret", Duration::minutes(30)));
        let service = AccountService::new(
            Arc::new(SqliteUserRepository::new(db)),
            PasswordHasher::new(4),
            tokens.clone(),
        )
        .unwrap();
        (service, tokens, dir)
    }

    #[tokio::test]
    async fn registering_twice_is_duplicate_email() {
        let (service, _tokens, _dir) = service().await;

        let user = service.register("a@x.com", "password1").await.unwrap();
        assert_eq!(user.id, 1);
        assert_ne!(user.hashed_password, "password1");

        let err = service.register("a@x.com", "password2").await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
    }

    #[tokio::test]
    async fn login_issues_token_for_subject() {
        let (service, tokens, _dir) = service().await;
        service.register("a@x.com", "password1").await.unwrap();

        let token = service.login("a@x.com", "password1").await.unwrap();
        assert_eq!(tokens.validate(&token).unwrap(), "a@x.com");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (service, _tokens, _dir) = service().await;
        service.register("a@x.com", "password1").await.unwrap();

        let wrong_password = service.login("a@x.com", "password9").await.unwrap_err();
        let unknown_email = service.login("b@x.com", "password1").await.unwrap_err();

        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(unknown_email, AccountError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn unknown_email_is_checked_against_a_hash_of_the_configured_cost() {
        let (service, _tokens, _dir) = service().await;

        assert!(service.dummy_hash.starts_with("$2b$04$"));
        assert!(service.hasher.verify(DUMMY_PASSWORD, &service.dummy_hash));

        let err = service.login("nobody@x.com", DUMMY_PASSWORD).await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn email_domain_is_case_insensitive() {
        let (service, tokens, _dir) = service().await;

        let user = service.register("Ann@X.COM", "password1").await.unwrap();
        assert_eq!(user.email, "Ann@x.com");

        let err = service.register("Ann@x.com", "password1").await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));

        let token = service.login("Ann@x.Com", "password1").await.unwrap();
        assert_eq!(tokens.validate(&token).unwrap(), "Ann@x.com");
    }
}
