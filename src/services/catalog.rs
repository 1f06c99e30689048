//! Catalog service: authors, books and genres

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{AuthorQuery, CreateAuthor, UpdateAuthor},
        book::{BookQuery, CreateBook, UpdateBook},
        genre::{CreateGenre, GenreQuery, UpdateGenre},
        Author, Book, BookDetails, Genre,
    },
    repository::{FieldMap, Repository},
};

use super::page_bounds;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // --- Authors ---

    pub async fn list_authors(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        let (offset, limit) = page_bounds(query.page, query.per_page);

        let mut filters = FieldMap::new();
        if let Some(ref name) = query.name {
            filters.set("name", name.clone());
        }

        let authors = self
            .repository
            .authors
            .get_all(offset, limit, &filters)
            .await?;
        let total = self.repository.authors.count(&filters).await?;
        Ok((authors, total))
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository
            .authors
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn create_author(&self, payload: CreateAuthor) -> AppResult<Author> {
        let mut fields = FieldMap::new();
        fields.set("name", payload.name);
        if let Some(biography) = payload.biography {
            fields.set("biography", biography);
        }
        fields.set("birth_date", payload.birth_date);

        self.repository.authors.create(&fields).await
    }

    pub async fn update_author(&self, id: i32, payload: UpdateAuthor) -> AppResult<Author> {
        let mut fields = FieldMap::new();
        if let Some(name) = payload.name {
            fields.set("name", name);
        }
        if let Some(biography) = payload.biography {
            fields.set("biography", biography);
        }
        if let Some(birth_date) = payload.birth_date {
            fields.set("birth_date", birth_date);
        }

        self.repository
            .authors
            .update(id, &fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Delete an author. Forbidden while books still reference the author.
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        let mut by_author = FieldMap::new();
        by_author.set("author_id", id);
        if self.repository.books.count(&by_author).await? > 0 {
            return Err(AppError::BusinessRule(
                "Author still has books in the catalog".to_string(),
            ));
        }

        if !self.repository.authors.delete(id).await? {
            return Err(AppError::NotFound(format!(
                "Author with id {} not found",
                id
            )));
        }
        Ok(())
    }

    // --- Books ---

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (offset, limit) = page_bounds(query.page, query.per_page);

        let mut filters = FieldMap::new();
        if let Some(ref title) = query.title {
            filters.set("title", title.clone());
        }
        if let Some(author_id) = query.author_id {
            filters.set("author_id", author_id);
        }

        let books = self.repository.books.get_all(offset, limit, &filters).await?;
        let total = self.repository.books.count(&filters).await?;
        Ok((books, total))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self
            .repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        let genres = self.repository.book_genres.genres_of_book(id).await?;
        Ok(BookDetails::from_book(book, genres))
    }

    pub async fn create_book(&self, payload: CreateBook) -> AppResult<BookDetails> {
        // The author reference must resolve before the write
        if self
            .repository
            .authors
            .find_by_id(payload.author_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Author with id {} not found",
                payload.author_id
            )));
        }

        let mut fields = FieldMap::new();
        fields.set("title", payload.title);
        if let Some(description) = payload.description {
            fields.set("description", description);
        }
        fields.set("publication_date", payload.publication_date);
        fields.set("author_id", payload.author_id);
        fields.set("available_copies", payload.available_copies.unwrap_or(1));

        let book = self.repository.books.create(&fields).await?;

        if !payload.genre_ids.is_empty() {
            self.repository
                .book_genres
                .replace_for_book(book.id, &payload.genre_ids)
                .await?;
        }

        self.get_book(book.id).await
    }

    pub async fn update_book(&self, id: i32, payload: UpdateBook) -> AppResult<BookDetails> {
        if let Some(author_id) = payload.author_id {
            if self
                .repository
                .authors
                .find_by_id(author_id)
                .await?
                .is_none()
            {
                return Err(AppError::NotFound(format!(
                    "Author with id {} not found",
                    author_id
                )));
            }
        }

        let mut fields = FieldMap::new();
        if let Some(title) = payload.title {
            fields.set("title", title);
        }
        if let Some(description) = payload.description {
            fields.set("description", description);
        }
        if let Some(publication_date) = payload.publication_date {
            fields.set("publication_date", publication_date);
        }
        if let Some(author_id) = payload.author_id {
            fields.set("author_id", author_id);
        }
        if let Some(available_copies) = payload.available_copies {
            fields.set("available_copies", available_copies);
        }

        let book = self
            .repository
            .books
            .update(id, &fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(ref genre_ids) = payload.genre_ids {
            self.repository
                .book_genres
                .replace_for_book(book.id, genre_ids)
                .await?;
        }

        self.get_book(book.id).await
    }

    /// Delete a book. Forbidden while loans still reference it; genre
    /// links are detached first.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut by_book = FieldMap::new();
        by_book.set("book_id", id);
        if self.repository.loans.count(&by_book).await? > 0 {
            return Err(AppError::BusinessRule(
                "Book still has loans on record".to_string(),
            ));
        }

        self.repository.book_genres.clear_for_book(id).await?;

        if !self.repository.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    // --- Genres ---

    pub async fn list_genres(&self, query: &GenreQuery) -> AppResult<(Vec<Genre>, i64)> {
        let (offset, limit) = page_bounds(query.page, query.per_page);

        let mut filters = FieldMap::new();
        if let Some(ref name) = query.name {
            filters.set("name", name.clone());
        }

        let genres = self
            .repository
            .genres
            .get_all(offset, limit, &filters)
            .await?;
        let total = self.repository.genres.count(&filters).await?;
        Ok((genres, total))
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.repository
            .genres
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    /// Books carrying a genre
    pub async fn genre_books(&self, id: i32) -> AppResult<Vec<Book>> {
        self.get_genre(id).await?;
        self.repository.book_genres.books_of_genre(id).await
    }

    pub async fn create_genre(&self, payload: CreateGenre) -> AppResult<Genre> {
        let mut fields = FieldMap::new();
        fields.set("name", payload.name);
        self.repository.genres.create(&fields).await
    }

    pub async fn update_genre(&self, id: i32, payload: UpdateGenre) -> AppResult<Genre> {
        let mut fields = FieldMap::new();
        if let Some(name) = payload.name {
            fields.set("name", name);
        }

        self.repository
            .genres
            .update(id, &fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    /// Delete a genre, detaching it from any books first
    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.book_genres.clear_for_genre(id).await?;

        if !self.repository.genres.delete(id).await? {
            return Err(AppError::NotFound(format!(
                "Genre with id {} not found",
                id
            )));
        }
        Ok(())
    }
}
