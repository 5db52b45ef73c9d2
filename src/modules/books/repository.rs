use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use shelf_db::{Database, DbError};
use shelf_http::AppError;
use thiserror::Error;

use super::models::{Book, BookInput};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("book {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound(id) => {
                tracing::warn!(book_id = id, "book not found");
                AppError::not_found("Book not found")
            }
            BookError::Storage(err) => AppError::Internal(err.into()),
        }
    }
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Book>, BookError>;
    async fn get(&self, id: i64) -> Result<Book, BookError>;
    async fn create(&self, input: BookInput) -> Result<Book, BookError>;
    async fn update(&self, id: i64, input: BookInput) -> Result<Book, BookError>;
    async fn delete(&self, id: i64) -> Result<(), BookError>;
}

#[derive(Clone)]
pub struct SqliteBookRepository {
    db: Database,
}

impl SqliteBookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        price: row.get("price")?,
    })
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn list(&self) -> Result<Vec<Book>, BookError> {
        self.db
            .run(|conn| -> Result<Vec<Book>, DbError> {
                let mut stmt =
                    conn.prepare("SELECT id, title, author, price FROM books ORDER BY id")?;
                let books = stmt
                    .query_map([], book_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(books)
            })
            .await
            .map_err(BookError::from)
    }

    async fn get(&self, id: i64) -> Result<Book, BookError> {
        self.db
            .run(move |conn| {
                conn.query_row(
                    "SELECT id, title, author, price FROM books WHERE id = ?1",
                    params![id],
                    book_from_row,
                )
                .optional()
                .map_err(DbError::from)?
                .ok_or(BookError::NotFound(id))
            })
            .await
    }

    async fn create(&self, input: BookInput) -> Result<Book, BookError> {
        self.db
            .run(move |conn| {
                let book = conn
                    .query_row(
                        "INSERT INTO books (title, author, price) VALUES (?1, ?2, ?3)
                         RETURNING id, title, author, price",
                        params![input.title, input.author, input.price],
                        book_from_row,
                    )
                    .map_err(DbError::from)?;
                Ok(book)
            })
            .await
    }

    async fn update(&self, id: i64, input: BookInput) -> Result<Book, BookError> {
        self.db
            .run(move |conn| {
                conn.query_row(
                    "UPDATE books SET title = ?1, author = ?2, price = ?3 WHERE id = ?4
                     RETURNING id, title, author, price",
                    params![input.title, input.author, input.price, id],
                    book_from_row,
                )
                .optional()
                .map_err(DbError::from)?
                .ok_or(BookError::NotFound(id))
            })
            .await
    }

    async fn delete(&self, id: i64) -> Result<(), BookError> {
        self.db
            .run(move |conn| {
                let removed = conn
                    .execute("DELETE FROM books WHERE id = ?1", params![id])
                    .map_err(DbError::from)?;
                if removed == 0 {
                    return Err(BookError::NotFound(id));
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_database;

    fn dune() -> BookInput {
        BookInput {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            price: 9.99,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_same_fields() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteBookRepository::new(db);

        let created = repo.create(dune()).await.unwrap();
        assert_eq!(created.id, 1);

        let fetched = repo.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.price, 9.99);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteBookRepository::new(db);
        let created = repo.create(dune()).await.unwrap();

        let changed = BookInput {
            title: "Dune Messiah".to_string(),
            author: "Frank Herbert".to_string(),
            price: 12.5,
        };
        let updated = repo.update(created.id, changed.clone()).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, changed.title);
        assert_eq!(repo.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteBookRepository::new(db);
        let created = repo.create(dune()).await.unwrap();

        repo.delete(created.id).await.unwrap();

        assert!(matches!(
            repo.get(created.id).await,
            Err(BookError::NotFound(id)) if id == created.id
        ));
        assert!(matches!(
            repo.delete(created.id).await,
            Err(BookError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_missing_book_is_not_found() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteBookRepository::new(db);

        assert!(matches!(
            repo.update(42, dune()).await,
            Err(BookError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn list_returns_books_in_id_order() {
        let (db, _dir) = migrated_database().await;
        let repo = SqliteBookRepository::new(db);
        assert!(repo.list().await.unwrap().is_empty());

        repo.create(dune()).await.unwrap();
        repo.create(BookInput {
            title: "Hyperion".to_string(),
            author: "Simmons".to_string(),
            price: 0.0,
        })
        .await
        .unwrap();

        let titles: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["Dune", "Hyperion"]);
    }
}
