pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_authz::AuthState;
use shelf_kernel::{InitCtx, Migration, Module};

use repository::BookRepository;

/// Book catalog CRUD, guarded by bearer authentication
pub struct BooksModule {
    books: Arc<dyn BookRepository>,
    auth: AuthState,
}

impl BooksModule {
    pub fn new(books: Arc<dyn BookRepository>, auth: AuthState) -> Self {
        Self { books, auth }
    }
}

pub(crate) fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                title  TEXT NOT NULL,
                author TEXT NOT NULL,
                price  REAL NOT NULL CHECK (price >= 0)
            );
            CREATE INDEX IF NOT EXISTS idx_books_title ON books (title);
            "#,
    }]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.books.clone(), self.auth.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = serde_json::json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let with_description = |description: &str| {
            let mut response = error.clone();
            response["description"] = serde_json::Value::from(description);
            response
        };
        let book = serde_json::json!({
            "application/json": { "schema": { "$ref": "#/components/schemas/Book" } }
        });
        let book_input = serde_json::json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/BookCreate" } }
            }
        });
        let id_param = serde_json::json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer" }
        }]);
        let security = serde_json::json!([{ "bearerAuth": [] }]);

        Some(serde_json::json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "security": security,
                        "responses": {
                            "200": {
                                "description": "All books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "401": with_description("Not authenticated")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": security,
                        "requestBody": book_input,
                        "responses": {
                            "201": { "description": "Created book", "content": book },
                            "401": with_description("Not authenticated"),
                            "422": with_description("Validation error")
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "security": security,
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "Book", "content": book },
                            "401": with_description("Not authenticated"),
                            "404": with_description("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Replace a book",
                        "tags": ["Books"],
                        "security": security,
                        "parameters": id_param,
                        "requestBody": book_input,
                        "responses": {
                            "200": { "description": "Updated book", "content": book },
                            "401": with_description("Not authenticated"),
                            "404": with_description("Book not found"),
                            "422": with_description("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": security,
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "Deletion message" },
                            "401": with_description("Not authenticated"),
                            "404": with_description("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string", "maxLength": 255 },
                            "author": { "type": "string", "maxLength": 100 },
                            "price": { "type": "number", "minimum": 0 }
                        },
                        "required": ["id", "title", "author", "price"]
                    },
                    "BookCreate": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": 255 },
                            "author": { "type": "string", "maxLength": 100 },
                            "price": { "type": "number", "minimum": 0 }
                        },
                        "required": ["title", "author", "price"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(books: Arc<dyn BookRepository>, auth: AuthState) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(books, auth))
}
