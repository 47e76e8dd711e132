use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{policy::ensure_owner, Identity};
use crate::database::models::{NewUser, User, UserPatch};
use crate::error::ApiError;
use crate::middleware::{ParsedBody, Verified};

/// POST /users - Create a user from `{username, password}`
pub async fn create(
    State(state): State<AppState>,
    Verified(new_user): Verified<NewUser>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.create(new_user).await?;
    tracing::info!("Created user {}", user.id);
    Ok(Json(user))
}

/// GET /users - Every user, unpaginated
pub async fn find(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.find().await?))
}

/// GET /users/:id - One user, or `null` when nothing matches
pub async fn find_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<User>>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.users.find_by_id(id).await?))
}

/// PUT /users/:id - Self-service update.
///
/// Responds with the record as it was before the update. An empty body
/// writes nothing and returns the current record.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    body: Result<ParsedBody, ApiError>,
) -> Result<Json<Option<User>>, ApiError> {
    ensure_owner(&identity, &id)?;

    let ParsedBody(body) = body?;
    let patch = UserPatch::from_value(&body)?;
    let id = parse_id(&id)?;

    if patch.is_empty() {
        return Ok(Json(state.users.find_by_id(id).await?));
    }

    let before = state.users.find_by_id_and_update(id, patch).await?;
    if before.is_some() {
        tracing::info!("Updated user {}", id);
    }
    Ok(Json(before))
}

/// DELETE /users/:id - Self-service delete
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<StatusCode, ApiError> {
    ensure_owner(&identity, &id)?;

    let id = parse_id(&id)?;
    if state.users.find_by_id_and_delete(id).await?.is_some() {
        tracing::info!("Deleted user {}", id);
    }
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid user id: {}", raw)))
}
