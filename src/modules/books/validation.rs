//! Book payload validation.
//!
//! A [`BookSchema`] inspects a raw JSON payload for one operation mode and
//! either yields typed values or a [`ValidationErrors`] listing every problem
//! it found. It never short-circuits and never touches the store.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::models::{Book, BookChanges};

pub const REQUIRED: &str = "required";
pub const NOT_A_STRING: &str = "must be a string";
pub const EMPTY: &str = "must not be empty";
pub const NOT_POSITIVE_INTEGER: &str = "must be a positive integer";
pub const NOT_A_YEAR: &str = "must be an integer between 0 and 9999";
pub const NOT_ALLOWED: &str = "is not allowed";
pub const NOT_AN_OBJECT: &str = "must be a JSON object";

const MAX_YEAR: i64 = 9999;

/// Which operation a payload is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// POST: every field including `isbn`
    Create,
    /// PUT: every field except `isbn`, which comes from the path
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Text {
    Any,
    NonEmpty,
}

const ISBN: &str = "isbn";

const MUTABLE_FIELDS: &[&str] = &[
    "amazon_url",
    "author",
    "language",
    "pages",
    "publisher",
    "title",
    "year",
];

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub error: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            error: error.into(),
        }
    }
}

/// Every violation found in a payload, in field order followed by unknown keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} invalid field(s)", .0.len())]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// True if `field` failed with `error`
    pub fn contains(&self, field: &str, error: &str) -> bool {
        self.0.iter().any(|v| v.field == field && v.error == error)
    }
}

/// Validation rules for one [`Mode`].
#[derive(Debug, Clone, Copy)]
pub struct BookSchema {
    mode: Mode,
}

impl BookSchema {
    pub const fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub const fn create() -> Self {
        Self::new(Mode::Create)
    }

    pub const fn update() -> Self {
        Self::new(Mode::Update)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Field names accepted in this mode, in reporting order.
    pub fn recognized_fields(&self) -> Vec<&'static str> {
        let isbn = match self.mode {
            Mode::Create => Some(ISBN),
            Mode::Update => None,
        };
        isbn.into_iter()
            .chain(MUTABLE_FIELDS.iter().copied())
            .collect()
    }

    fn is_recognized(&self, key: &str) -> bool {
        (self.mode == Mode::Create && key == ISBN) || MUTABLE_FIELDS.iter().any(|name| *name == key)
    }

    /// Check `payload` and return the isbn (create mode only) and mutable fields.
    pub fn check(&self, payload: &Value) -> Result<(Option<String>, BookChanges), ValidationErrors> {
        let Some(object) = payload.as_object() else {
            return Err(ValidationErrors(vec![Violation::new("body", NOT_AN_OBJECT)]));
        };

        let mut collector = Collector {
            object,
            violations: Vec::new(),
        };

        let isbn = match self.mode {
            Mode::Create => collector.text(ISBN, Text::NonEmpty),
            Mode::Update => None,
        };
        let amazon_url = collector.text("amazon_url", Text::Any);
        let author = collector.text("author", Text::Any);
        let language = collector.text("language", Text::Any);
        let pages = collector.pages("pages");
        let publisher = collector.text("publisher", Text::Any);
        let title = collector.text("title", Text::NonEmpty);
        let year = collector.year("year");

        for key in object.keys() {
            if !self.is_recognized(key) {
                collector.violations.push(Violation::new(key.as_str(), NOT_ALLOWED));
            }
        }

        if !collector.violations.is_empty() {
            return Err(ValidationErrors(collector.violations));
        }

        match (amazon_url, author, language, pages, publisher, title, year) {
            (
                Some(amazon_url),
                Some(author),
                Some(language),
                Some(pages),
                Some(publisher),
                Some(title),
                Some(year),
            ) => Ok((
                isbn,
                BookChanges {
                    amazon_url,
                    author,
                    language,
                    pages,
                    publisher,
                    title,
                    year,
                },
            )),
            // Unreachable while every failed extraction records a violation
            _ => Err(ValidationErrors(vec![Violation::new("body", REQUIRED)])),
        }
    }
}

/// Validate a POST body into a full [`Book`].
pub fn validate_new_book(payload: &Value) -> Result<Book, ValidationErrors> {
    match BookSchema::create().check(payload)? {
        (Some(isbn), changes) => Ok(changes.into_book(isbn)),
        (None, _) => Err(ValidationErrors(vec![Violation::new(ISBN, REQUIRED)])),
    }
}

/// Validate a PUT body into the replacement mutable fields.
pub fn validate_book_update(payload: &Value) -> Result<BookChanges, ValidationErrors> {
    BookSchema::update()
        .check(payload)
        .map(|(_, changes)| changes)
}

struct Collector<'a> {
    object: &'a Map<String, Value>,
    violations: Vec<Violation>,
}

impl<'a> Collector<'a> {
    fn fail(&mut self, field: &str, error: &str) {
        self.violations.push(Violation::new(field, error));
    }

    fn present(&mut self, field: &str) -> Option<&'a Value> {
        let object = self.object;
        match object.get(field) {
            Some(value) => Some(value),
            None => {
                self.fail(field, REQUIRED);
                None
            }
        }
    }

    fn text(&mut self, field: &str, rule: Text) -> Option<String> {
        let value = self.present(field)?.clone();
        match value {
            Value::String(text) if rule == Text::NonEmpty && text.trim().is_empty() => {
                self.fail(field, EMPTY);
                None
            }
            Value::String(text) => Some(text),
            _ => {
                self.fail(field, NOT_A_STRING);
                None
            }
        }
    }

    fn pages(&mut self, field: &str) -> Option<u32> {
        let pages = self
            .present(field)?
            .as_u64()
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok());
        if pages.is_none() {
            self.fail(field, NOT_POSITIVE_INTEGER);
        }
        pages
    }

    fn year(&mut self, field: &str) -> Option<i32> {
        let year = self
            .present(field)?
            .as_i64()
            .filter(|y| (0..=MAX_YEAR).contains(y))
            .and_then(|y| i32::try_from(y).ok());
        if year.is_none() {
            self.fail(field, NOT_A_YEAR);
        }
        year
    }
}
