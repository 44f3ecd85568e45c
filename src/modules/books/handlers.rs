//! One handler per verb on `/api/v1/books`.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
};
use serde_json::{json, Value};

use bookshelf_db::{schema, Book, BookId, BookPatch, NewBook, SharedStore};
use bookshelf_http::{ApiResponse, AppError, Pagination};

use super::errors::{normalize, not_found};
use super::query::{self, ListParams};

type HandlerResult<T> = Result<ApiResponse<T>, AppError>;

/// `GET /`: filtered, paginated list
pub async fn list_books(
    State(store): State<SharedStore>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> HandlerResult<Vec<Book>> {
    // An undecodable query string lists with the defaults.
    let pairs = pairs.map(|Query(pairs)| pairs).unwrap_or_default();
    let query = query::build(&ListParams::from_pairs(pairs));

    let total = store.count(&query.filter).await.map_err(normalize)?;
    let books = store
        .find(&query.filter, query.window)
        .await
        .map_err(normalize)?;

    let pagination = Pagination {
        total,
        page: query.page,
        pages: query.window.page_count(total),
    };

    let count = books.len();
    Ok(ApiResponse::ok(books)
        .with_count(count)
        .with_pagination(pagination))
}

/// `GET /{id}`
pub async fn get_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> HandlerResult<Book> {
    let id = BookId::parse(&id).map_err(normalize)?;
    let book = store
        .find_by_id(&id)
        .await
        .map_err(normalize)?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::ok(book))
}

/// `POST /`
pub async fn create_book(State(store): State<SharedStore>, body: Bytes) -> HandlerResult<Book> {
    let body = schema::decode_body(&body).map_err(normalize)?;
    let new_book = NewBook::from_json(&body).map_err(normalize)?;
    let book = store.create(new_book).await.map_err(normalize)?;

    tracing::info!(book_id = %book.id, "book created");
    Ok(ApiResponse::created(book))
}

/// `PUT /{id}`: partial update; absent fields keep their values
pub async fn update_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    body: Bytes,
) -> HandlerResult<Book> {
    let id = BookId::parse(&id).map_err(normalize)?;
    let body = schema::decode_body(&body).map_err(normalize)?;
    let patch = BookPatch::from_json(&body).map_err(normalize)?;

    let book = store
        .update(&id, patch)
        .await
        .map_err(normalize)?
        .ok_or_else(not_found)?;

    tracing::info!(book_id = %book.id, "book updated");
    Ok(ApiResponse::ok(book))
}

/// `DELETE /{id}` answers with an empty object, never the deleted record
pub async fn delete_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> HandlerResult<Value> {
    let id = BookId::parse(&id).map_err(normalize)?;
    if !store.delete(&id).await.map_err(normalize)? {
        return Err(not_found());
    }

    tracing::info!(book_id = %id, "book deleted");
    Ok(ApiResponse::ok(json!({})))
}
