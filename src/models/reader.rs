//! Reader model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::repository::Entity;

/// Reader model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reader {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub joined_date: NaiveDate,
}

impl Entity for Reader {
    const TABLE: &'static str = "readers";
    const COLUMNS: &'static [&'static str] = &["id", "name", "email", "joined_date"];
}

/// Create reader request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReader {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Defaults to the current date when omitted
    pub joined_date: Option<NaiveDate>,
}

/// Update reader request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReader {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub joined_date: Option<NaiveDate>,
}

/// Reader list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ReaderQuery {
    /// Exact-match filter on name
    pub name: Option<String>,
    /// Exact-match filter on email
    pub email: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
