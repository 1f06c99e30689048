//! Repository layer for database operations

pub mod book_genres;
pub mod circulation;
pub mod dao;

pub use dao::{Dao, Entity, FieldMap, SqlValue};

use sqlx::{Pool, Postgres};

use crate::models::{Author, Book, Genre, Loan, Reader, User};

/// Main repository struct holding the database connection pool
///
/// The pool is the only process-wide store state; it is injected here and
/// passed down explicitly so tests can substitute their own.
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: Dao<Author>,
    pub books: Dao<Book>,
    pub genres: Dao<Genre>,
    pub readers: Dao<Reader>,
    pub loans: Dao<Loan>,
    pub users: Dao<User>,
    pub book_genres: book_genres::BookGenresRepository,
    pub circulation: circulation::CirculationRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Dao::new(pool.clone()),
            books: Dao::new(pool.clone()),
            genres: Dao::new(pool.clone()),
            readers: Dao::new(pool.clone()),
            loans: Dao::new(pool.clone()),
            users: Dao::new(pool.clone()),
            book_genres: book_genres::BookGenresRepository::new(pool.clone()),
            circulation: circulation::CirculationRepository::new(pool.clone()),
            pool,
        }
    }
}
