use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    options::{ClientOptions, ReturnDocument},
    Client, Collection, Database,
};
use serde::{Deserialize, Serialize};

use bookshelf_kernel::settings::DatabaseSettings;

use crate::clock;
use crate::error::StoreResult;
use crate::model::{Book, BookFilter, BookId, BookPatch, NewBook, Window};
use crate::store::BookStore;

const APP_NAME: &str = "bookshelf";

/// Stored shape of a book document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rating: Option<i64>,
    #[serde(default)]
    is_read: bool,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<BookDocument> for Book {
    fn from(document: BookDocument) -> Self {
        Book {
            id: document.id.into(),
            title: document.title,
            author: document.author,
            year: document.year,
            genre: document.genre,
            rating: document.rating,
            is_read: document.is_read,
            created_at: clock::from_bson(document.created_at),
            updated_at: clock::from_bson(document.updated_at),
        }
    }
}

/// MongoDB-backed [`BookStore`].
#[derive(Debug, Clone)]
pub struct MongoBookStore {
    database: Database,
    collection: Collection<BookDocument>,
}

impl MongoBookStore {
    /// Connect and verify the deployment answers a `ping`.
    ///
    /// The driver connects lazily, so the ping is what makes an unreachable
    /// server fail here rather than on the first request.
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let timeout = Duration::from_millis(settings.connect_timeout_ms);

        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .with_context(|| format!("invalid MongoDB connection string '{}'", settings.redacted_uri()))?;
        options.app_name = Some(APP_NAME.to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).context("failed to build MongoDB client")?;
        let database = client.database(&settings.database);
        let store = Self {
            collection: database.collection(&settings.collection),
            database,
        };
        store.ping().await?;

        tracing::info!(
            target: "bookshelf-db",
            uri = %settings.redacted_uri(),
            database = %settings.database,
            collection = %settings.collection,
            "connected to MongoDB"
        );
        Ok(store)
    }
}

/// Translate the predicate into a query document.
fn filter_document(filter: &BookFilter) -> Document {
    let mut document = Document::new();
    if let Some(genre) = &filter.genre {
        document.insert("genre", genre.as_str());
    }
    if let Some(pattern) = filter.author_pattern() {
        document.insert("author", doc! { "$regex": pattern, "$options": "i" });
    }
    if let Some(min_rating) = filter.min_rating {
        document.insert("rating", doc! { "$gte": min_rating });
    }
    if let Some(is_read) = filter.is_read {
        document.insert("isRead", is_read);
    }
    document
}

/// Update pipeline for a patch. Values are wrapped in `$literal` so user text
/// starting with `$` is never read as a field path; `updatedAt` becomes
/// `max(now, updatedAt + 1ms)`.
fn update_pipeline(patch: BookPatch) -> Vec<Document> {
    let mut set = Document::new();
    let mut unset: Vec<String> = Vec::new();

    let mut assign = |field: &str, value: Option<Bson>| match value {
        Some(value) => {
            set.insert(field, doc! { "$literal": value });
        }
        None => unset.push(field.to_string()),
    };

    if let Some(title) = patch.title {
        assign("title", Some(title.into()));
    }
    if let Some(author) = patch.author {
        assign("author", Some(author.into()));
    }
    if let Some(year) = patch.year {
        assign("year", year.map(Bson::from));
    }
    if let Some(genre) = patch.genre {
        assign("genre", genre.map(Bson::from));
    }
    if let Some(rating) = patch.rating {
        assign("rating", rating.map(Bson::from));
    }
    if let Some(is_read) = patch.is_read {
        assign("isRead", Some(is_read.into()));
    }

    set.insert(
        "updatedAt",
        doc! { "$max": ["$$NOW", { "$add": ["$updatedAt", 1_i64] }] },
    );

    let mut pipeline = vec![doc! { "$set": set }];
    if !unset.is_empty() {
        pipeline.push(doc! { "$unset": unset });
    }
    pipeline
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl BookStore for MongoBookStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn count(&self, filter: &BookFilter) -> StoreResult<u64> {
        let total = self
            .collection
            .count_documents(filter_document(filter))
            .await
            .context("failed to count books")?;
        Ok(total)
    }

    async fn find(&self, filter: &BookFilter, window: Window) -> StoreResult<Vec<Book>> {
        let cursor = self
            .collection
            .find(filter_document(filter))
            .sort(doc! { "_id": 1 })
            .skip(window.offset)
            .limit(to_i64(window.limit))
            .await
            .context("failed to query books")?;
        let documents: Vec<BookDocument> = cursor
            .try_collect()
            .await
            .context("failed to read books cursor")?;
        Ok(documents.into_iter().map(Book::from).collect())
    }

    async fn find_by_id(&self, id: &BookId) -> StoreResult<Option<Book>> {
        let document = self
            .collection
            .find_one(doc! { "_id": id.object_id() })
            .await
            .with_context(|| format!("failed to load book {id}"))?;
        Ok(document.map(Book::from))
    }

    async fn create(&self, book: NewBook) -> StoreResult<Book> {
        let record = Book::from_new(BookId::generate(), book, clock::now());
        let document = BookDocument {
            id: record.id.object_id(),
            title: record.title.clone(),
            author: record.author.clone(),
            year: record.year,
            genre: record.genre.clone(),
            rating: record.rating,
            is_read: record.is_read,
            created_at: clock::to_bson(record.created_at),
            updated_at: clock::to_bson(record.updated_at),
        };
        self.collection
            .insert_one(&document)
            .await
            .context("failed to insert book")?;
        Ok(record)
    }

    async fn update(&self, id: &BookId, patch: BookPatch) -> StoreResult<Option<Book>> {
        let document = self
            .collection
            .find_one_and_update(doc! { "_id": id.object_id() }, update_pipeline(patch))
            .return_document(ReturnDocument::After)
            .await
            .with_context(|| format!("failed to update book {id}"))?;
        Ok(document.map(Book::from))
    }

    async fn delete(&self, id: &BookId) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id.object_id() })
            .await
            .with_context(|| format!("failed to delete book {id}"))?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(filter_document(&BookFilter::default()).is_empty());
    }

    #[test]
    fn filter_document_escapes_author_text() {
        let filter = BookFilter {
            genre: Some("Classic".into()),
            author: Some("F. Scott".into()),
            min_rating: Some(4),
            is_read: Some(false),
        };

        assert_eq!(
            filter_document(&filter),
            doc! {
                "genre": "Classic",
                "author": { "$regex": "F\\. Scott", "$options": "i" },
                "rating": { "$gte": 4_i64 },
                "isRead": false,
            }
        );
    }

    #[test]
    fn update_pipeline_sets_literals_and_unsets_cleared_fields() {
        let serde_json::Value::Object(body) = json!({
            "title": "$where",
            "genre": null,
        }) else {
            unreachable!()
        };
        let pipeline = update_pipeline(BookPatch::from_json(&body).unwrap());

        assert_eq!(pipeline.len(), 2);
        let set = pipeline[0].get_document("$set").unwrap();
        assert_eq!(set.get_document("title").unwrap(), &doc! { "$literal": "$where" });
        assert!(set.contains_key("updatedAt"));
        assert_eq!(pipeline[1], doc! { "$unset": ["genre"] });
    }

    #[test]
    fn empty_patch_still_refreshes_updated_at() {
        let pipeline = update_pipeline(BookPatch::default());
        assert_eq!(pipeline.len(), 1);
        let set = pipeline[0].get_document("$set").unwrap();
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["updatedAt"]);
    }
}
