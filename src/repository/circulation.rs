//! Circulation repository: transactional borrow and return
//!
//! Loan creation and return touch two tables (loans, books.available_copies)
//! and must stay atomic: the book row is locked, the copy count checked and
//! adjusted, and the loan written inside one transaction.

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::dao::store_error;
use crate::error::{AppError, AppResult};
use crate::models::Loan;

const TABLE: &str = "loans";

#[derive(Clone)]
pub struct CirculationRepository {
    pool: Pool<Postgres>,
}

impl CirculationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Borrow a book: check-and-decrement the copy count and insert the loan
    /// in one transaction.
    pub async fn borrow(
        &self,
        reader_id: i32,
        book_id: i32,
        issue_date: NaiveDate,
    ) -> AppResult<Loan> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(e, TABLE, "borrow"))?;

        // Lock the book row so concurrent borrows serialize on the count
        let copies: Option<(i32,)> =
            match sqlx::query_as("SELECT available_copies FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await
            {
                Ok(row) => row,
                Err(e) => {
                    tx.rollback().await.ok();
                    return Err(store_error(e, TABLE, "borrow"));
                }
            };

        let copies = match copies {
            Some((n,)) => n,
            None => {
                tx.rollback().await.ok();
                return Err(AppError::NotFound(format!(
                    "Book with id {} not found",
                    book_id
                )));
            }
        };

        if copies <= 0 {
            tx.rollback().await.ok();
            return Err(AppError::BusinessRule(format!(
                "Book with id {} has no available copies",
                book_id
            )));
        }

        if let Err(e) = sqlx::query("UPDATE books SET available_copies = available_copies - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await
        {
            tx.rollback().await.ok();
            return Err(store_error(e, TABLE, "borrow"));
        }

        let loan = match sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (reader_id, book_id, issue_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(reader_id)
        .bind(book_id)
        .bind(issue_date)
        .fetch_one(&mut *tx)
        .await
        {
            Ok(loan) => loan,
            Err(e) => {
                tx.rollback().await.ok();
                return Err(store_error(e, TABLE, "borrow"));
            }
        };

        tx.commit()
            .await
            .map_err(|e| store_error(e, TABLE, "borrow"))?;

        tracing::info!(loan_id = loan.id, reader_id, book_id, "book borrowed");
        Ok(loan)
    }

    /// Return a borrowed book: set the return date and restore the copy
    /// count in one transaction. Double returns are rejected.
    pub async fn finish(&self, loan_id: i32, return_date: NaiveDate) -> AppResult<Loan> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(e, TABLE, "finish"))?;

        let loan: Option<Loan> =
            match sqlx::query_as("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
                .bind(loan_id)
                .fetch_optional(&mut *tx)
                .await
            {
                Ok(row) => row,
                Err(e) => {
                    tx.rollback().await.ok();
                    return Err(store_error(e, TABLE, "finish"));
                }
            };

        let loan = match loan {
            Some(loan) => loan,
            None => {
                tx.rollback().await.ok();
                return Err(AppError::NotFound(format!(
                    "Loan with id {} not found",
                    loan_id
                )));
            }
        };

        if loan.return_date.is_some() {
            tx.rollback().await.ok();
            return Err(AppError::BusinessRule(format!(
                "Loan with id {} is already returned",
                loan_id
            )));
        }

        let updated = match sqlx::query_as::<_, Loan>(
            "UPDATE loans SET return_date = $1 WHERE id = $2 RETURNING *",
        )
        .bind(return_date)
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await
        {
            Ok(loan) => loan,
            Err(e) => {
                tx.rollback().await.ok();
                return Err(store_error(e, TABLE, "finish"));
            }
        };

        if let Err(e) = sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await
        {
            tx.rollback().await.ok();
            return Err(store_error(e, TABLE, "finish"));
        }

        tx.commit()
            .await
            .map_err(|e| store_error(e, TABLE, "finish"))?;

        tracing::info!(loan_id, book_id = loan.book_id, "book returned");
        Ok(updated)
    }
}
