//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::repository::Entity;

/// Full author model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub biography: Option<String>,
    pub birth_date: NaiveDate,
}

impl Entity for Author {
    const TABLE: &'static str = "authors";
    const COLUMNS: &'static [&'static str] = &["id", "name", "biography", "birth_date"];
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub biography: Option<String>,
    pub birth_date: NaiveDate,
}

/// Update author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub biography: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Author list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AuthorQuery {
    /// Exact-match filter on name
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
