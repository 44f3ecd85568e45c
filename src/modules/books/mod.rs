pub mod errors;
pub mod handlers;
pub mod query;

use anyhow::Context;
use async_trait::async_trait;
use axum::{routing::get, Router};
use serde_json::json;

use bookshelf_db::SharedStore;
use bookshelf_kernel::{InitCtx, Module};

/// Books collection: CRUD over the record store
pub struct BooksModule {
    store: SharedStore,
}

impl BooksModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.store
            .ping()
            .await
            .with_context(|| format!("{} store is unreachable", self.store.backend()))?;

        tracing::info!(
            module = self.name(),
            backend = self.store.backend(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(handlers::list_books).post(handlers::create_book),
            )
            .route(
                "/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(store))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookEnvelope" }
            }
        }
    })
}

fn id_parameter() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "24-character hexadecimal book identifier",
        "schema": { "type": "string" }
    })
}

fn query_parameter(name: &str, description: &str) -> serde_json::Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "description": description,
        "schema": { "type": "string" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        query_parameter("genre", "Exact genre match"),
                        query_parameter("author", "Case-insensitive author substring"),
                        query_parameter("minRating", "Minimum rating, inclusive"),
                        query_parameter("isRead", "true or false"),
                        query_parameter("page", "1-based page number, default 1"),
                        query_parameter("limit", "Page size, default 10")
                    ],
                    "responses": {
                        "200": {
                            "description": "A page of books",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookListEnvelope" }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookInput" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Created book"),
                        "400": error_response("Validation failure"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": book_response("The book"),
                        "400": error_response("Invalid book ID format"),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "description": "Only supplied fields change; updatedAt always refreshes.",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookInput" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Invalid book ID format or validation failure"),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": {
                            "description": "Deleted; data is an empty object",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "success": { "type": "boolean" },
                                            "data": { "type": "object" }
                                        }
                                    }
                                }
                            }
                        },
                        "400": error_response("Invalid book ID format"),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Store-assigned identifier" },
                        "title": { "type": "string", "maxLength": 100 },
                        "author": { "type": "string" },
                        "year": { "type": "integer", "minimum": 0 },
                        "genre": { "type": "string" },
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "isRead": { "type": "boolean" },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "isRead", "createdAt", "updatedAt"]
                },
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 100 },
                        "author": { "type": "string" },
                        "year": { "type": "integer", "minimum": 0 },
                        "genre": { "type": "string" },
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "isRead": { "type": "boolean", "default": false }
                    }
                },
                "BookEnvelope": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "data": { "$ref": "#/components/schemas/Book" }
                    },
                    "required": ["success", "data"]
                },
                "BookListEnvelope": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "count": { "type": "integer" },
                        "pagination": {
                            "type": "object",
                            "properties": {
                                "total": { "type": "integer" },
                                "page": { "type": "integer" },
                                "pages": { "type": "integer" }
                            }
                        },
                        "data": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        }
                    },
                    "required": ["success", "count", "pagination", "data"]
                }
            }
        }
    })
}
