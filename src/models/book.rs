//! Book model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::genre::Genre;
use crate::repository::Entity;

/// Full book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub publication_date: NaiveDate,
    pub author_id: i32,
    pub available_copies: i32,
}

impl Entity for Book {
    const TABLE: &'static str = "books";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "description",
        "publication_date",
        "author_id",
        "available_copies",
    ];
}

/// Book with its associated genres for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub publication_date: NaiveDate,
    pub author_id: i32,
    pub available_copies: i32,
    pub genres: Vec<Genre>,
}

impl BookDetails {
    pub fn from_book(book: Book, genres: Vec<Genre>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            description: book.description,
            publication_date: book.publication_date,
            author_id: book.author_id,
            available_copies: book.available_copies,
            genres,
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub publication_date: NaiveDate,
    pub author_id: i32,
    /// Defaults to 1 when omitted
    #[validate(range(min = 0, message = "Copy count must not be negative"))]
    pub available_copies: Option<i32>,
    /// Genres to associate with the book
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub author_id: Option<i32>,
    #[validate(range(min = 0, message = "Copy count must not be negative"))]
    pub available_copies: Option<i32>,
    /// When present, replaces the book's genre set
    pub genre_ids: Option<Vec<i32>>,
}

/// Book list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Exact-match filter on title
    pub title: Option<String>,
    /// Filter by author
    pub author_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
