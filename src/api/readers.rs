//! Reader management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        reader::{CreateReader, ReaderQuery, UpdateReader},
        Loan, Reader,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List readers with pagination
#[utoipa::path(
    get,
    path = "/readers",
    tag = "readers",
    security(("cookie_auth" = [])),
    params(ReaderQuery),
    responses(
        (status = 200, description = "List of readers", body = PaginatedResponse<Reader>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_readers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ReaderQuery>,
) -> AppResult<Json<PaginatedResponse<Reader>>> {
    let (readers, total) = state.services.readers.list_readers(&query).await?;

    Ok(Json(PaginatedResponse {
        items: readers,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get reader details by ID
#[utoipa::path(
    get,
    path = "/readers/{id}",
    tag = "readers",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Reader details", body = Reader),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn get_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reader>> {
    let reader = state.services.readers.get_reader(id).await?;
    Ok(Json(reader))
}

/// Get loans of a reader
#[utoipa::path(
    get,
    path = "/readers/{id}/loans",
    tag = "readers",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Loans of this reader", body = Vec<Loan>),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn reader_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.reader_loans(id).await?;
    Ok(Json(loans))
}

/// Create a new reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    security(("cookie_auth" = [])),
    request_body = CreateReader,
    responses(
        (status = 201, description = "Reader created", body = Reader),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Name or email already exists")
    )
)]
pub async fn create_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateReader>,
) -> AppResult<(StatusCode, Json<Reader>)> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created = state.services.readers.create_reader(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing reader
#[utoipa::path(
    put,
    path = "/readers/{id}",
    tag = "readers",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    request_body = UpdateReader,
    responses(
        (status = 200, description = "Reader updated", body = Reader),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn update_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateReader>,
) -> AppResult<Json<Reader>> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state.services.readers.update_reader(id, payload).await?;
    Ok(Json(updated))
}

/// Delete a reader
#[utoipa::path(
    delete,
    path = "/readers/{id}",
    tag = "readers",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 204, description = "Reader deleted"),
        (status = 404, description = "Reader not found"),
        (status = 422, description = "Reader still has loans")
    )
)]
pub async fn delete_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    state.services.readers.delete_reader(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
