//! Book-genre association repository
//!
//! Maintains the many-to-many link table between books and genres. Link
//! replacement runs in a single transaction so a book is never observed
//! with a half-updated genre set.

use sqlx::{Pool, Postgres};

use super::dao::store_error;
use crate::error::AppResult;
use crate::models::{Book, Genre};

const TABLE: &str = "book_genres";

#[derive(Clone)]
pub struct BookGenresRepository {
    pool: Pool<Postgres>,
}

impl BookGenresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Genres associated with a book
    pub async fn genres_of_book(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name
            FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            WHERE bg.book_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, TABLE, "genres_of_book"))
    }

    /// Books associated with a genre
    pub async fn books_of_genre(&self, genre_id: i32) -> AppResult<Vec<Book>> {
        sqlx::query_as::<_, Book>(
            r#"
            SELECT b.*
            FROM books b
            JOIN book_genres bg ON bg.book_id = b.id
            WHERE bg.genre_id = $1
            ORDER BY b.id
            "#,
        )
        .bind(genre_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, TABLE, "books_of_genre"))
    }

    /// Replace the genre set of a book
    ///
    /// A nonexistent genre id violates the link table's foreign key and
    /// surfaces as a Conflict; the whole replacement rolls back.
    pub async fn replace_for_book(&self, book_id: i32, genre_ids: &[i32]) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(e, TABLE, "replace_for_book"))?;

        if let Err(e) = sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await
        {
            tx.rollback().await.ok();
            return Err(store_error(e, TABLE, "replace_for_book"));
        }

        for genre_id in genre_ids {
            if let Err(e) =
                sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES ($1, $2)")
                    .bind(book_id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await
            {
                tx.rollback().await.ok();
                return Err(store_error(e, TABLE, "replace_for_book"));
            }
        }

        tx.commit()
            .await
            .map_err(|e| store_error(e, TABLE, "replace_for_book"))?;
        Ok(())
    }

    /// Remove all links of a book (before deleting the book)
    pub async fn clear_for_book(&self, book_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, TABLE, "clear_for_book"))?;
        Ok(())
    }

    /// Remove all links of a genre (before deleting the genre)
    pub async fn clear_for_genre(&self, genre_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM book_genres WHERE genre_id = $1")
            .bind(genre_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, TABLE, "clear_for_genre"))?;
        Ok(())
    }
}
