//! Group handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gramline_storage::models::{CreateGroup, Group};
use gramline_storage::repository::GroupRepository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{default_limit, internal_error, not_found, ApiError};
use crate::auth::AppState;

/// Query parameters for listing groups
#[derive(Debug, Deserialize)]
pub struct ListGroupsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// List groups
///
/// GET /api/v1/groups
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListGroupsQuery>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let repo = GroupRepository::new(state.db_pool.pool().clone());

    let groups = repo
        .list(query.limit, query.offset)
        .await
        .map_err(|e| internal_error("Failed to list groups", e))?;

    Ok(Json(groups))
}

/// Register a target group
///
/// POST /api/v1/groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateGroup>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let repo = GroupRepository::new(state.db_pool.pool().clone());

    let group = repo
        .create(input)
        .await
        .map_err(|e| internal_error("Failed to create group", e))?;

    info!(group = %group.id, "Group registered");

    Ok((StatusCode::CREATED, Json(group)))
}

/// Get a group
///
/// GET /api/v1/groups/:group_id
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Group>, ApiError> {
    let repo = GroupRepository::new(state.db_pool.pool().clone());

    let group = repo
        .get(group_id)
        .await
        .map_err(|e| internal_error("Failed to load group", e))?
        .ok_or_else(|| not_found("Group"))?;

    Ok(Json(group))
}

/// Delete a group
///
/// DELETE /api/v1/groups/:group_id
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.db_pool.pool().clone());

    let deleted = repo
        .delete(group_id)
        .await
        .map_err(|e| internal_error("Failed to delete group", e))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Group"))
    }
}
