//! Store failure classification for the books routes.

use bookshelf_db::StoreError;
use bookshelf_http::AppError;

pub const INVALID_ID: &str = "Invalid book ID format";
pub const NOT_FOUND: &str = "Book not found";

/// Map a store failure onto its response shape.
pub fn normalize(err: StoreError) -> AppError {
    match err {
        StoreError::MalformedId(_) => AppError::bad_request(INVALID_ID),
        StoreError::Validation(messages) => AppError::validation(messages),
        StoreError::Backend(source) => AppError::Internal(source),
    }
}

/// Absence is decided by the handlers, not classified from a failure.
pub fn not_found() -> AppError {
    AppError::not_found(NOT_FOUND)
}
