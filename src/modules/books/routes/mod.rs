//! HTTP handlers for `/books`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_http::AppError;
use serde_json::{json, Value};

use super::models::{BookListResponse, BookResponse, MessageResponse};
use super::repository::{BookRepository, RepositoryError};
use super::validation::{validate_book_update, validate_new_book, ValidationErrors};

pub const DELETED_MESSAGE: &str = "Book Deleted";

/// Shared handler dependencies.
#[derive(Clone)]
pub struct BooksState {
    pub repository: Arc<dyn BookRepository>,
}

/// Routes relative to the module mount point.
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(state)
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .violations()
            .iter()
            .map(|v| json!({"field": v.field, "error": v.error}))
            .collect();
        AppError::validation(details, "Book payload failed validation")
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(isbn) => {
                AppError::not_found(format!("There is no book with an isbn of '{isbn}'"))
            }
            RepositoryError::Conflict(isbn) => AppError::conflict(
                vec![json!({"field": "isbn", "error": "already exists"})],
                format!("A book with isbn '{isbn}' already exists"),
            ),
            RepositoryError::Store(db) => {
                AppError::Internal(anyhow::Error::new(db).context("book store failure"))
            }
        }
    }
}

/// `POST /books`
async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(payload) = payload?;
    let book = validate_new_book(&payload)?;
    let book = state.repository.create(book).await?;

    tracing::info!(isbn = %book.isbn, "book created");
    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

/// `GET /books`
async fn list_books(State(state): State<BooksState>) -> Result<Json<BookListResponse>, AppError> {
    let books = state.repository.list().await?;
    Ok(Json(BookListResponse { books }))
}

/// `GET /books/{isbn}`
async fn get_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = state.repository.get(&isbn).await?;
    Ok(Json(BookResponse { book }))
}

/// `PUT /books/{isbn}`; the body is validated before the book is looked up.
async fn update_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(payload) = payload?;
    let changes = validate_book_update(&payload)?;
    let book = state.repository.update(&isbn, changes).await?;

    tracing::info!(isbn = %book.isbn, "book updated");
    Ok(Json(BookResponse { book }))
}

/// `DELETE /books/{isbn}`
async fn delete_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repository.delete(&isbn).await?;

    tracing::info!(isbn = %isbn, "book deleted");
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE.to_string(),
    }))
}
