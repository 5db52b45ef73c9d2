use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use shelf_authz::{Identity, IdentityLookup};
use shelf_db::{Database, DbError};

use super::models::User;

/// Credential store
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Insert a new account; a taken email surfaces as a UNIQUE violation.
    async fn insert(&self, email: &str, hashed_password: &str) -> Result<User, DbError>;
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    db: Database,
}

impl SqliteUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        hashed_password: row.get("hashed_password")?,
    })
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();
        self.db
            .run(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, email, hashed_password FROM users WHERE email = ?1",
                        params![email],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
    }

    async fn insert(&self, email: &str, hashed_password: &str) -> Result<User, DbError> {
        let email = email.to_string();
        let hashed_password = hashed_password.to_string();
        self.db
            .run(move |conn| {
                let user = conn.query_row(
                    "INSERT INTO users (email, hashed_password) VALUES (?1, ?2)
                     RETURNING id, email, hashed_password",
                    params![email, hashed_password],
                    user_from_row,
                )?;
                Ok(user)
            })
            .await
    }
}

#[async_trait]
impl IdentityLookup for SqliteUserRepository {
    async fn resolve(&self, subject: &str) -> anyhow::Result<Option<Identity>> {
        let user = self.find_by_email(subject).await?;
        Ok(user.map(|user| Identity {
            id: user.id,
            email: user.email,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_database;

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteUserRepository::new(db);

        let first = repo.insert("a@x.com", "hash-a").await.unwrap();
        let second = repo.insert("b@x.com", "hash-b").await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.email, "b@x.com");
    }

    #[tokio::test]
    async fn find_by_email_round_trips() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteUserRepository::new(db);
        let created = repo.insert("a@x.com", "hash-a").await.unwrap();

        assert_eq!(repo.find_by_email("a@x.com").await.unwrap(), Some(created));
        assert_eq!(repo.find_by_email("nobody@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteUserRepository::new(db);
        repo.insert("a@x.com", "hash-a").await.unwrap();

        let err = repo.insert("a@x.com", "hash-b").await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn resolve_maps_account_to_identity() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteUserRepository::new(db);
        repo.insert("a@x.com", "hash-a").await.unwrap();

        let identity = repo.resolve("a@x.com").await.unwrap().unwrap();
        assert_eq!(identity.id, 1);
        assert_eq!(identity.email, "a@x.com");
        assert!(repo.resolve("ghost@x.com").await.unwrap().is_none());
    }
}
