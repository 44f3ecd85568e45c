use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::clock;
use crate::error::StoreResult;
use crate::model::{Book, BookFilter, BookId, BookPatch, NewBook, Window};
use crate::store::BookStore;

/// In-process store with the same semantics as the MongoDB adapter.
///
/// Object ids grow monotonically within a process, so the map's key order
/// is creation order.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: RwLock<BTreeMap<BookId, Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl BookStore for MemoryBookStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn count(&self, filter: &BookFilter) -> StoreResult<u64> {
        let matcher = filter.matcher()?;
        let books = self.books.read().await;
        Ok(books.values().filter(|book| matcher.matches(book)).count() as u64)
    }

    async fn find(&self, filter: &BookFilter, window: Window) -> StoreResult<Vec<Book>> {
        let matcher = filter.matcher()?;
        let books = self.books.read().await;
        Ok(books
            .values()
            .filter(|book| matcher.matches(book))
            .skip(to_usize(window.offset))
            .take(to_usize(window.limit))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &BookId) -> StoreResult<Option<Book>> {
        Ok(self.books.read().await.get(id).cloned())
    }

    async fn create(&self, book: NewBook) -> StoreResult<Book> {
        let record = Book::from_new(BookId::generate(), book, clock::now());
        self.books.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &BookId, patch: BookPatch) -> StoreResult<Option<Book>> {
        let mut books = self.books.write().await;
        let Some(book) = books.get_mut(id) else {
            return Ok(None);
        };
        book.apply(patch);
        book.updated_at = clock::next_update(book.updated_at);
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: &BookId) -> StoreResult<bool> {
        Ok(self.books.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn new_book(value: Value) -> NewBook {
        let Value::Object(fields) = value else {
            panic!("expected an object");
        };
        NewBook::from_json(&fields).unwrap()
    }

    fn patch(value: Value) -> BookPatch {
        let Value::Object(fields) = value else {
            panic!("expected an object");
        };
        BookPatch::from_json(&fields).unwrap()
    }

    async fn seeded() -> MemoryBookStore {
        let store = MemoryBookStore::new();
        for (title, author, genre, rating) in [
            ("The Great Gatsby", "F. Scott Fitzgerald", "Classic", 4),
            ("To Kill a Mockingbird", "Harper Lee", "Classic", 5),
            ("Dune", "Frank Herbert", "Science Fiction", 3),
        ] {
            store
                .create(new_book(json!({
                    "title": title,
                    "author": author,
                    "genre": genre,
                    "rating": rating,
                })))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_and_equal_timestamps() {
        let store = MemoryBookStore::new();
        let first = store
            .create(new_book(json!({ "title": "A", "author": "B" })))
            .await
            .unwrap();
        let second = store
            .create(new_book(json!({ "title": "C", "author": "D" })))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.find_by_id(&first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn find_filters_then_windows_in_creation_order() {
        let store = seeded().await;
        let classics = BookFilter {
            genre: Some("Classic".into()),
            ..BookFilter::default()
        };

        assert_eq!(store.count(&classics).await.unwrap(), 2);

        let first_page = store.find(&classics, Window::for_page(1, 1)).await.unwrap();
        assert_eq!(first_page.len(), 1);
        assert_eq!(first_page[0].title, "The Great Gatsby");

        let second_page = store.find(&classics, Window::for_page(2, 1)).await.unwrap();
        assert_eq!(second_page[0].title, "To Kill a Mockingbird");

        let beyond = store.find(&classics, Window::for_page(3, 1)).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_unsupplied_fields_and_advances_updated_at() {
        let store = seeded().await;
        let all = store
            .find(&BookFilter::default(), Window::for_page(1, 10))
            .await
            .unwrap();
        let original = all[0].clone();

        let updated = store
            .update(&original.id, patch(json!({ "isRead": true })))
            .await
            .unwrap()
            .unwrap();
        let again = store
            .update(&original.id, BookPatch::default())
            .await
            .unwrap()
            .unwrap();

        assert!(updated.is_read);
        assert_eq!(updated.title, original.title);
        assert_eq!(updated.rating, original.rating);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert!(again.updated_at > updated.updated_at);
    }

    #[tokio::test]
    async fn missing_records_are_absent_not_errors() {
        let store = MemoryBookStore::new();
        let id = BookId::parse("65a1b2c3d4e5f60718293a4b").unwrap();

        assert_eq!(store.find_by_id(&id).await.unwrap(), None);
        assert_eq!(store.update(&id, BookPatch::default()).await.unwrap(), None);
        assert!(!store.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let store = seeded().await;
        let book = store
            .find(&BookFilter::default(), Window::for_page(1, 1))
            .await
            .unwrap()
            .remove(0);

        assert!(store.delete(&book.id).await.unwrap());
        assert!(!store.delete(&book.id).await.unwrap());
        assert_eq!(store.find_by_id(&book.id).await.unwrap(), None);
        assert_eq!(store.count(&BookFilter::default()).await.unwrap(), 2);
    }
}
