use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

static BOOK_DIR: Dir = include_dir!("src/books");

const LIBRARY_FILE: &str = "library.json";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizItem {
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

/// A picture book: lines read aloud in order, then a comprehension quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub lines: Vec<String>,
    pub comprehension: Vec<QuizItem>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("library file {0} not found")]
    MissingFile(String),
    #[error("library file {0} is not valid UTF-8")]
    NotUtf8(String),
    #[error("unable to deserialize library json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("book {0} is listed more than once")]
    DuplicateBook(BookId),
    #[error("book {0} has no lines")]
    NoLines(BookId),
    #[error("book {book} question {index} has fewer than two options")]
    TooFewOptions { book: BookId, index: usize },
    #[error("book {book} question {index} answer {answer:?} is not one of its options")]
    AnswerNotAnOption {
        book: BookId,
        index: usize,
        answer: String,
    },
}

#[derive(Deserialize)]
struct LibraryFile {
    books: Vec<Book>,
}

/// Immutable set of books, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    /// Loads the library bundled into the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        let file = BOOK_DIR
            .get_file(LIBRARY_FILE)
            .ok_or_else(|| CatalogError::MissingFile(LIBRARY_FILE.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| CatalogError::NotUtf8(LIBRARY_FILE.to_string()))?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let library: LibraryFile = serde_json::from_str(json)?;
        Self::new(library.books)
    }

    pub fn new(mut books: Vec<Book>) -> Result<Self, CatalogError> {
        books.sort_by(|a, b| a.id.cmp(&b.id));
        for pair in books.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(CatalogError::DuplicateBook(pair[0].id.clone()));
            }
        }
        for book in &books {
            validate(book)?;
        }
        Ok(Self { books })
    }

    pub fn get(&self, id: &BookId) -> Option<&Book> {
        self.books
            .binary_search_by(|b| b.id.cmp(id))
            .ok()
            .map(|idx| &self.books[idx])
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

fn validate(book: &Book) -> Result<(), CatalogError> {
    if book.lines.is_empty() {
        return Err(CatalogError::NoLines(book.id.clone()));
    }
    for (index, item) in book.comprehension.iter().enumerate() {
        if item.options.len() < 2 {
            return Err(CatalogError::TooFewOptions {
                book: book.id.clone(),
                index,
            });
        }
        if !item.options.contains(&item.correct_answer) {
            return Err(CatalogError::AnswerNotAnOption {
                book: book.id.clone(),
                index,
                answer: item.correct_answer.clone(),
            });
        }
    }
    Ok(())
}
