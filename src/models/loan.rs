//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::repository::Entity;

/// Loan model from database
///
/// `return_date` is NULL while the loan is outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub reader_id: i32,
    pub book_id: i32,
    pub issue_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Entity for Loan {
    const TABLE: &'static str = "loans";
    const COLUMNS: &'static [&'static str] =
        &["id", "reader_id", "book_id", "issue_date", "return_date"];
}

impl Loan {
    pub fn is_outstanding(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Create loan (borrow) request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub reader_id: i32,
    pub book_id: i32,
    /// Defaults to the current date when omitted
    pub issue_date: Option<NaiveDate>,
}

/// Loan list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// Filter by reader
    pub reader_id: Option<i32>,
    /// Filter by book
    pub book_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
