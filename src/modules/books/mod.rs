pub mod models;
pub mod repository;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::{Database, SchemaDefinition};
use bookstore_kernel::{InitCtx, Module};
use serde_json::{json, Value};

use repository::{BookRepository, SqlBookRepository, BOOKS_TABLE};
use routes::BooksState;

/// Book catalogue: CRUD over the `books` table
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self {
            state: BooksState { repository },
        }
    }
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
            database = ctx.db.location(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn schema(&self) -> Vec<SchemaDefinition> {
        vec![BOOKS_TABLE]
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        ctx.db.ping().await?;
        let books = self.state.repository.list().await?.len();
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module backed by `db`
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(SqlBookRepository::new(db))))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn isbn_parameter() -> Value {
    json!({
        "name": "isbn",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    })
}

fn book_envelope() -> Value {
    json!({
        "type": "object",
        "properties": { "book": { "$ref": "#/components/schemas/Book" } },
        "required": ["book"]
    })
}

fn openapi_fragment() -> Value {
    let string = json!({ "type": "string" });
    let book_fields = json!({
        "amazon_url": string,
        "author": string,
        "language": string,
        "pages": { "type": "integer", "minimum": 1 },
        "publisher": string,
        "title": { "type": "string", "minLength": 1 },
        "year": { "type": "integer", "minimum": 0, "maximum": 9999 }
    });
    let mutable_required = json!([
        "amazon_url", "author", "language", "pages", "publisher", "title", "year"
    ]);

    let mut book_properties = book_fields.clone();
    book_properties["isbn"] = string.clone();
    let mut book_required = mutable_required.clone();
    if let Some(required) = book_required.as_array_mut() {
        required.insert(0, json!("isbn"));
    }

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("All books ordered by isbn", json!({
                            "type": "object",
                            "properties": {
                                "books": {
                                    "type": "array",
                                    "items": { "$ref": "#/components/schemas/Book" }
                                }
                            },
                            "required": ["books"]
                        })),
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
                                "schema": { "$ref": "#/components/schemas/Book" }
                            }
                        }
                    },
                    "responses": {
                        "201": json_response("Book created", book_envelope()),
                        "400": error_response("Invalid payload or duplicate isbn"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{isbn}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [isbn_parameter()],
                    "responses": {
                        "200": json_response("The book", book_envelope()),
                        "404": error_response("No book with this isbn")
                    }
                },
                "put": {
                    "summary": "Replace every mutable field of a book",
                    "tags": ["Books"],
                    "parameters": [isbn_parameter()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookChanges" }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("Book updated", book_envelope()),
                        "400": error_response("Invalid payload"),
                        "404": error_response("No book with this isbn")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [isbn_parameter()],
                    "responses": {
                        "200": json_response("Book deleted", json!({
                            "type": "object",
                            "properties": { "message": { "type": "string" } },
                            "required": ["message"]
                        })),
                        "404": error_response("No book with this isbn")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": book_properties,
                    "required": book_required,
                    "additionalProperties": false
                },
                "BookChanges": {
                    "type": "object",
                    "properties": book_fields,
                    "required": mutable_required,
                    "additionalProperties": false
                }
            }
        }
    })
}
