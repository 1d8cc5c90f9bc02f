use serde::{Deserialize, Serialize};

/// A catalogued book, keyed by ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Primary key; immutable once created
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    /// Spoken language the book is written in
    pub language: String,
    pub pages: u32,
    pub publisher: String,
    pub title: String,
    /// Publication year
    pub year: i32,
}

/// Every mutable field of a [`Book`]; a PUT replaces all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChanges {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: u32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

impl BookChanges {
    pub fn into_book(self, isbn: impl Into<String>) -> Book {
        Book {
            isbn: isbn.into(),
            amazon_url: self.amazon_url,
            author: self.author,
            language: self.language,
            pages: self.pages,
            publisher: self.publisher,
            title: self.title,
            year: self.year,
        }
    }
}

/// `{ "book": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub book: Book,
}

/// `{ "books": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookListResponse {
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
