//! Genre management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        genre::{CreateGenre, GenreQuery, UpdateGenre},
        Book, Genre,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List genres with pagination
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    security(("cookie_auth" = [])),
    params(GenreQuery),
    responses(
        (status = 200, description = "List of genres", body = PaginatedResponse<Genre>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_genres(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<GenreQuery>,
) -> AppResult<Json<PaginatedResponse<Genre>>> {
    let (genres, total) = state.services.catalog.list_genres(&query).await?;

    Ok(Json(PaginatedResponse {
        items: genres,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get genre details by ID
#[utoipa::path(
    get,
    path = "/genres/{id}",
    tag = "genres",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Genre details", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Genre>> {
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(Json(genre))
}

/// List books carrying a genre
#[utoipa::path(
    get,
    path = "/genres/{id}/books",
    tag = "genres",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Books in this genre", body = Vec<Book>),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn genre_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.genre_books(id).await?;
    Ok(Json(books))
}

/// Create a new genre
#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    security(("cookie_auth" = [])),
    request_body = CreateGenre,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Name already exists")
    )
)]
pub async fn create_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateGenre>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created = state.services.catalog.create_genre(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing genre
#[utoipa::path(
    put,
    path = "/genres/{id}",
    tag = "genres",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    request_body = UpdateGenre,
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateGenre>,
) -> AppResult<Json<Genre>> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state.services.catalog.update_genre(id, payload).await?;
    Ok(Json(updated))
}

/// Delete a genre (detaches it from its books)
#[utoipa::path(
    delete,
    path = "/genres/{id}",
    tag = "genres",
    security(("cookie_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    state.services.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
