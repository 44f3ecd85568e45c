//! Book persistence: the record model, its schema constraints, and the
//! `BookStore` adapters (MongoDB for deployments, in-memory for tests and
//! local runs).

mod clock;
pub mod error;
pub mod memory;
pub mod model;
pub mod mongo;
pub mod schema;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryBookStore;
pub use model::{Book, BookFilter, BookId, BookPatch, NewBook, Window};
pub use mongo::MongoBookStore;
pub use store::{BookStore, SharedStore};
