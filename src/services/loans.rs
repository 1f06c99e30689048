//! Loan management service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, LoanQuery},
        Loan,
    },
    repository::{FieldMap, Repository},
};

use super::page_bounds;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<Loan>, i64)> {
        let (offset, limit) = page_bounds(query.page, query.per_page);

        let mut filters = FieldMap::new();
        if let Some(reader_id) = query.reader_id {
            filters.set("reader_id", reader_id);
        }
        if let Some(book_id) = query.book_id {
            filters.set("book_id", book_id);
        }

        let loans = self.repository.loans.get_all(offset, limit, &filters).await?;
        let total = self.repository.loans.count(&filters).await?;
        Ok((loans, total))
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        self.repository
            .loans
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Loans of one reader
    pub async fn reader_loans(&self, reader_id: i32) -> AppResult<Vec<Loan>> {
        // Verify the reader exists so an empty list means "no loans"
        if self
            .repository
            .readers
            .find_by_id(reader_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Reader with id {} not found",
                reader_id
            )));
        }

        let mut filters = FieldMap::new();
        filters.set("reader_id", reader_id);
        self.repository.loans.get_all(0, i64::MAX, &filters).await
    }

    /// Borrow a book for a reader
    pub async fn create_loan(&self, payload: CreateLoan) -> AppResult<Loan> {
        if self
            .repository
            .readers
            .find_by_id(payload.reader_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Reader with id {} not found",
                payload.reader_id
            )));
        }

        let issue_date = payload.issue_date.unwrap_or_else(|| Utc::now().date_naive());
        self.repository
            .circulation
            .borrow(payload.reader_id, payload.book_id, issue_date)
            .await
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, id: i32) -> AppResult<Loan> {
        self.repository
            .circulation
            .finish(id, Utc::now().date_naive())
            .await
    }

    /// Delete a loan record. Outstanding loans must be returned first so
    /// the copy accounting stays consistent.
    pub async fn delete_loan(&self, id: i32) -> AppResult<()> {
        let loan = self.get_loan(id).await?;
        if loan.is_outstanding() {
            return Err(AppError::BusinessRule(
                "Loan is still outstanding; return the book first".to_string(),
            ));
        }

        if !self.repository.loans.delete(id).await? {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }
        Ok(())
    }
}
