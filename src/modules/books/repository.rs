use async_trait::async_trait;
use bookstore_db::{params, rusqlite, Database, DbError, OptionalExtension, Row, SchemaDefinition};
use thiserror::Error;

use super::models::{Book, BookChanges};

pub const BOOKS_TABLE: SchemaDefinition = SchemaDefinition {
    id: "001_books",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS books (
            isbn       TEXT    PRIMARY KEY,
            amazon_url TEXT    NOT NULL,
            author     TEXT    NOT NULL,
            language   TEXT    NOT NULL,
            pages      INTEGER NOT NULL CHECK (pages > 0),
            publisher  TEXT    NOT NULL,
            title      TEXT    NOT NULL CHECK (title <> ''),
            year       INTEGER NOT NULL
        );
    "#,
};

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("book {0} not found")]
    NotFound(String),

    #[error("book {0} already exists")]
    Conflict(String),

    #[error("book store failure: {0}")]
    Store(#[from] DbError),
}

/// Persistence capability for books. Every call is a single statement.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book; fails with `Conflict` if the isbn is taken
    async fn create(&self, book: Book) -> Result<Book, RepositoryError>;
    /// All books ordered by isbn
    async fn list(&self) -> Result<Vec<Book>, RepositoryError>;
    async fn get(&self, isbn: &str) -> Result<Book, RepositoryError>;
    /// Replace every mutable field of an existing book
    async fn update(&self, isbn: &str, changes: BookChanges) -> Result<Book, RepositoryError>;
    async fn delete(&self, isbn: &str) -> Result<(), RepositoryError>;
}

/// [`BookRepository`] over the `books` table.
#[derive(Debug, Clone)]
pub struct SqlBookRepository {
    db: Database,
}

impl SqlBookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get(0)?,
        amazon_url: row.get(1)?,
        author: row.get(2)?,
        language: row.get(3)?,
        pages: row.get(4)?,
        publisher: row.get(5)?,
        title: row.get(6)?,
        year: row.get(7)?,
    })
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn create(&self, book: Book) -> Result<Book, RepositoryError> {
        let isbn = book.isbn.clone();
        let sql = format!(
            "INSERT INTO books ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {COLUMNS}"
        );
        self.db
            .call(move |conn| {
                conn.query_row(
                    &sql,
                    params![
                        book.isbn,
                        book.amazon_url,
                        book.author,
                        book.language,
                        book.pages,
                        book.publisher,
                        book.title,
                        book.year
                    ],
                    book_from_row,
                )
            })
            .await
            .map_err(|err| {
                if err.is_unique_violation() {
                    RepositoryError::Conflict(isbn)
                } else {
                    RepositoryError::Store(err)
                }
            })
    }

    async fn list(&self) -> Result<Vec<Book>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM books ORDER BY isbn");
        let books = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(&sql)?;
                let books = stmt
                    .query_map([], book_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(books)
            })
            .await?;
        Ok(books)
    }

    async fn get(&self, isbn: &str) -> Result<Book, RepositoryError> {
        let key = isbn.to_string();
        let sql = format!("SELECT {COLUMNS} FROM books WHERE isbn = ?1");
        self.db
            .call(move |conn| conn.query_row(&sql, params![key], book_from_row).optional())
            .await?
            .ok_or_else(|| RepositoryError::NotFound(isbn.to_string()))
    }

    async fn update(&self, isbn: &str, changes: BookChanges) -> Result<Book, RepositoryError> {
        let key = isbn.to_string();
        let sql = format!(
            "UPDATE books
                SET amazon_url = ?2, author = ?3, language = ?4, pages = ?5,
                    publisher = ?6, title = ?7, year = ?8
              WHERE isbn = ?1
          RETURNING {COLUMNS}"
        );
        self.db
            .call(move |conn| {
                conn.query_row(
                    &sql,
                    params![
                        key,
                        changes.amazon_url,
                        changes.author,
                        changes.language,
                        changes.pages,
                        changes.publisher,
                        changes.title,
                        changes.year
                    ],
                    book_from_row,
                )
                .optional()
            })
            .await?
            .ok_or_else(|| RepositoryError::NotFound(isbn.to_string()))
    }

    async fn delete(&self, isbn: &str) -> Result<(), RepositoryError> {
        let key = isbn.to_string();
        let removed = self
            .db
            .call(move |conn| conn.execute("DELETE FROM books WHERE isbn = ?1", params![key]))
            .await?;
        if removed == 0 {
            return Err(RepositoryError::NotFound(isbn.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> SqlBookRepository {
        let db = Database::in_memory().unwrap();
        db.ensure_schema(vec![("books", BOOKS_TABLE)]).await.unwrap();
        SqlBookRepository::new(db)
    }

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            amazon_url: "https://amazon.com/taco".to_string(),
            author: "Elie".to_string(),
            language: "English".to_string(),
            pages: 100,
            publisher: "Nothing publishers".to_string(),
            title: title.to_string(),
            year: 2008,
        }
    }

    fn changes(title: &str) -> BookChanges {
        BookChanges {
            amazon_url: "https://amazon.com/cook".to_string(),
            author: "Lily".to_string(),
            language: "english".to_string(),
            pages: 400,
            publisher: "Box Press".to_string(),
            title: title.to_string(),
            year: 2005,
        }
    }

    #[tokio::test]
    async fn created_book_is_retrievable() {
        let repo = repository().await;
        let created = repo.create(book("123432122", "my first book")).await.unwrap();
        assert_eq!(created, book("123432122", "my first book"));
        assert_eq!(repo.get("123432122").await.unwrap(), created);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_conflict() {
        let repo = repository().await;
        repo.create(book("1", "first")).await.unwrap();
        let err = repo.create(book("1", "second")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(isbn) if isbn == "1"));
        assert_eq!(repo.get("1").await.unwrap().title, "first");
    }

    #[tokio::test]
    async fn check_constraint_failure_is_a_store_error() {
        let repo = repository().await;
        let mut bad = book("2", "ok");
        bad.pages = 0;
        let err = repo.create(bad).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Store(_)));
    }

    #[tokio::test]
    async fn list_is_ordered_by_isbn() {
        let repo = repository().await;
        assert!(repo.list().await.unwrap().is_empty());
        repo.create(book("300", "c")).await.unwrap();
        repo.create(book("100", "a")).await.unwrap();
        repo.create(book("200", "b")).await.unwrap();

        let isbns: Vec<_> = repo.list().await.unwrap().into_iter().map(|b| b.isbn).collect();
        assert_eq!(isbns, vec!["100", "200", "300"]);
    }

    #[tokio::test]
    async fn get_missing_book_is_not_found() {
        let repo = repository().await;
        let err = repo.get("999").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(isbn) if isbn == "999"));
    }

    #[tokio::test]
    async fn update_replaces_mutable_fields_only() {
        let repo = repository().await;
        repo.create(book("123432122", "my first book")).await.unwrap();

        let updated = repo
            .update("123432122", changes("Updated Book"))
            .await
            .unwrap();
        assert_eq!(updated, changes("Updated Book").into_book("123432122"));
        assert_eq!(repo.get("123432122").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_missing_book_is_not_found() {
        let repo = repository().await;
        let err = repo.update("999", changes("nope")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let repo = repository().await;
        repo.create(book("5", "gone soon")).await.unwrap();

        repo.delete("5").await.unwrap();
        assert!(matches!(repo.get("5").await, Err(RepositoryError::NotFound(_))));
        assert!(matches!(repo.delete("5").await, Err(RepositoryError::NotFound(_))));
    }
}
