//! Genre model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::repository::Entity;

/// Genre model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

impl Entity for Genre {
    const TABLE: &'static str = "genres";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
}

/// Create genre request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGenre {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
}

/// Update genre request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGenre {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
}

/// Genre list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct GenreQuery {
    /// Exact-match filter on name
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
