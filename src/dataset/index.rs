//! Dataset index parsing
//!
//! The index is the books → chapters → verses tree the crawler walks. It is
//! validated in full when parsed: a node missing its identity is a fatal
//! structural error, raised before any passage request spends quota.

use crate::dataset::Label;
use serde_json::{Map, Value};
use thiserror::Error;

/// Structural problems in a dataset index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index has no books[] array")]
    MissingBooks,

    #[error("book at position {position} is missing its id")]
    MissingBookId { position: usize },

    #[error("book {book_id}: chapters is not a list")]
    ChaptersNotList { book_id: String },

    #[error("book {book_id} chapter {chapter}: verses is not a list")]
    VersesNotList { book_id: String, chapter: Label },

    #[error("book {book_id} chapter {chapter} verse {verse}: missing passage_id")]
    MissingPassageId {
        book_id: String,
        chapter: Label,
        verse: Label,
    },

    #[error("{context} is not a JSON object")]
    NotAnObject { context: String },
}

/// The full books → chapters → verses tree for one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetIndex {
    pub books: Vec<IndexBook>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBook {
    /// Book code, e.g. "GEN"
    pub id: String,
    pub title: Option<String>,
    pub full_title: Option<String>,
    pub abbreviation: Option<String>,
    pub canon: Option<String>,
    pub chapters: Vec<IndexChapter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexChapter {
    pub label: Label,
    pub verses: Vec<IndexVerse>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexVerse {
    pub label: Label,
    /// Globally unique passage identifier, e.g. "GEN.1.1"
    pub passage_id: String,
}

impl DatasetIndex {
    /// Builds an index from the raw `/index` response
    ///
    /// Accepts `{"books": [...]}` and the wrapped `{"data": {"books": [...]}}`.
    pub fn from_value(value: &Value) -> Result<Self, IndexError> {
        let books = value
            .get("books")
            .and_then(Value::as_array)
            .or_else(|| {
                value
                    .get("data")
                    .and_then(|data| data.get("books"))
                    .and_then(Value::as_array)
            })
            .ok_or(IndexError::MissingBooks)?;

        let books = books
            .iter()
            .enumerate()
            .map(|(position, book)| parse_book(position, book))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { books })
    }

    /// Total number of verse units in the index
    pub fn unit_count(&self) -> usize {
        self.books
            .iter()
            .flat_map(|b| b.chapters.iter())
            .map(|c| c.verses.len())
            .sum()
    }

    /// Number of units strictly before the cursor `(bi, ci, vi)`
    ///
    /// Out-of-range components are clamped, so a cursor one past the end of a
    /// chapter or book counts that whole chapter or book.
    pub fn units_before(&self, bi: usize, ci: usize, vi: usize) -> usize {
        let mut count = 0;
        for (b, book) in self.books.iter().enumerate().take(bi.saturating_add(1)) {
            for (c, chapter) in book.chapters.iter().enumerate() {
                if b < bi || c < ci {
                    count += chapter.verses.len();
                } else if c == ci {
                    count += vi.min(chapter.verses.len());
                }
            }
        }
        count
    }
}

fn parse_book(position: usize, value: &Value) -> Result<IndexBook, IndexError> {
    let obj = as_object(value, || format!("book at position {}", position))?;

    let id = identity(obj.get("id")).ok_or(IndexError::MissingBookId { position })?;

    let chapters = obj
        .get("chapters")
        .and_then(Value::as_array)
        .ok_or_else(|| IndexError::ChaptersNotList {
            book_id: id.clone(),
        })?;

    let chapters = chapters
        .iter()
        .enumerate()
        .map(|(ci, chapter)| parse_chapter(&id, ci, chapter))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IndexBook {
        title: text(obj.get("title")),
        full_title: text(obj.get("full_title")),
        abbreviation: text(obj.get("abbreviation")),
        canon: text(obj.get("canon")),
        id,
        chapters,
    })
}

fn parse_chapter(book_id: &str, ci: usize, value: &Value) -> Result<IndexChapter, IndexError> {
    let obj = as_object(value, || format!("book {} chapter #{}", book_id, ci + 1))?;
    let label = label_for(obj, ci);

    let verses = obj
        .get("verses")
        .and_then(Value::as_array)
        .ok_or_else(|| IndexError::VersesNotList {
            book_id: book_id.to_string(),
            chapter: label.clone(),
        })?;

    let verses = verses
        .iter()
        .enumerate()
        .map(|(vi, verse)| {
            let obj = as_object(verse, || {
                format!("book {} chapter {} verse #{}", book_id, label, vi + 1)
            })?;
            let verse_label = label_for(obj, vi);
            let passage_id =
                identity(obj.get("passage_id")).ok_or_else(|| IndexError::MissingPassageId {
                    book_id: book_id.to_string(),
                    chapter: label.clone(),
                    verse: verse_label.clone(),
                })?;
            Ok(IndexVerse {
                label: verse_label,
                passage_id,
            })
        })
        .collect::<Result<Vec<_>, IndexError>>()?;

    Ok(IndexChapter { label, verses })
}

fn as_object<'a>(
    value: &'a Value,
    context: impl FnOnce() -> String,
) -> Result<&'a Map<String, Value>, IndexError> {
    value.as_object().ok_or_else(|| IndexError::NotAnObject {
        context: context(),
    })
}

/// `title`, then `id`, then the 1-based position
fn label_for(obj: &Map<String, Value>, position: usize) -> Label {
    obj.get("title")
        .and_then(Label::from_json)
        .or_else(|| obj.get("id").and_then(Label::from_json))
        .unwrap_or(Label::Numeric(position as i64 + 1))
}

/// Identifier fields may arrive as strings or integers
fn identity(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
