//! Book CRUD handlers. Every route sits behind the bearer guard; the caller
//! is logged but any authenticated account may act on any book.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use shelf_authz::{require_bearer, AuthState, Identity};
use shelf_http::{AppError, ValidJson, ValidPath};

use super::models::{Book, BookInput};
use super::repository::BookRepository;

type Books = Arc<dyn BookRepository>;

pub fn router(books: Books, auth: AuthState) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route_layer(from_fn_with_state(auth, require_bearer))
        .with_state(books)
}

async fn list_books(
    State(books): State<Books>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Vec<Book>>, AppError> {
    tracing::info!(user = %user.email, "listing books");
    Ok(Json(books.list().await?))
}

async fn get_book(
    State(books): State<Books>,
    Extension(user): Extension<Identity>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Book>, AppError> {
    tracing::info!(user = %user.email, book_id = id, "fetching book");
    Ok(Json(books.get(id).await?))
}

async fn create_book(
    State(books): State<Books>,
    Extension(user): Extension<Identity>,
    ValidJson(input): ValidJson<BookInput>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    tracing::info!(user = %user.email, title = %input.title, "creating book");
    let book = books.create(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(books): State<Books>,
    Extension(user): Extension<Identity>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<BookInput>,
) -> Result<Json<Book>, AppError> {
    tracing::info!(user = %user.email, book_id = id, title = %input.title, "updating book");
    Ok(Json(books.update(id, input).await?))
}

async fn delete_book(
    State(books): State<Books>,
    Extension(user): Extension<Identity>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Value>, AppError> {
    tracing::info!(user = %user.email, book_id = id, "deleting book");
    books.delete(id).await?;
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}
