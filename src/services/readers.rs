//! Reader management service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        reader::{CreateReader, ReaderQuery, UpdateReader},
        Reader,
    },
    repository::{FieldMap, Repository},
};

use super::page_bounds;

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
}

impl ReadersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_readers(&self, query: &ReaderQuery) -> AppResult<(Vec<Reader>, i64)> {
        let (offset, limit) = page_bounds(query.page, query.per_page);

        let mut filters = FieldMap::new();
        if let Some(ref name) = query.name {
            filters.set("name", name.clone());
        }
        if let Some(ref email) = query.email {
            filters.set("email", email.clone());
        }

        let readers = self
            .repository
            .readers
            .get_all(offset, limit, &filters)
            .await?;
        let total = self.repository.readers.count(&filters).await?;
        Ok((readers, total))
    }

    pub async fn get_reader(&self, id: i32) -> AppResult<Reader> {
        self.repository
            .readers
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
    }

    pub async fn create_reader(&self, payload: CreateReader) -> AppResult<Reader> {
        let mut fields = FieldMap::new();
        fields.set("name", payload.name);
        fields.set("email", payload.email);
        fields.set(
            "joined_date",
            payload.joined_date.unwrap_or_else(|| Utc::now().date_naive()),
        );

        self.repository.readers.create(&fields).await
    }

    pub async fn update_reader(&self, id: i32, payload: UpdateReader) -> AppResult<Reader> {
        let mut fields = FieldMap::new();
        if let Some(name) = payload.name {
            fields.set("name", name);
        }
        if let Some(email) = payload.email {
            fields.set("email", email);
        }
        if let Some(joined_date) = payload.joined_date {
            fields.set("joined_date", joined_date);
        }

        self.repository
            .readers
            .update(id, &fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
    }

    /// Delete a reader. Forbidden while loans still reference the reader.
    pub async fn delete_reader(&self, id: i32) -> AppResult<()> {
        let mut by_reader = FieldMap::new();
        by_reader.set("reader_id", id);
        if self.repository.loans.count(&by_reader).await? > 0 {
            return Err(AppError::BusinessRule(
                "Reader still has loans on record".to_string(),
            ));
        }

        if !self.repository.readers.delete(id).await? {
            return Err(AppError::NotFound(format!(
                "Reader with id {} not found",
                id
            )));
        }
        Ok(())
    }
}
