//! Account handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gramline_storage::models::{Account, CreateAccount, HealthEvent};
use gramline_storage::repository::{AccountRepository, HealthEventRepository};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{default_limit, internal_error, not_found, ApiError};
use crate::auth::AppState;

/// Query parameters for listing accounts
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// List accounts
///
/// GET /api/v1/accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let repo = AccountRepository::new(state.db_pool.pool().clone());

    let accounts = repo
        .list(query.limit, query.offset)
        .await
        .map_err(|e| internal_error("Failed to list accounts", e))?;

    Ok(Json(accounts))
}

/// Register an account
///
/// POST /api/v1/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateAccount>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let repo = AccountRepository::new(state.db_pool.pool().clone());

    let account = repo
        .create(input)
        .await
        .map_err(|e| internal_error("Failed to create account", e))?;

    info!(account = %account.id, "Account registered");

    Ok((StatusCode::CREATED, Json(account)))
}

/// Get an account
///
/// GET /api/v1/accounts/:account_id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, ApiError> {
    let repo = AccountRepository::new(state.db_pool.pool().clone());

    let account = repo
        .get(account_id)
        .await
        .map_err(|e| internal_error("Failed to load account", e))?
        .ok_or_else(|| not_found("Account"))?;

    Ok(Json(account))
}

/// Delete an account
///
/// DELETE /api/v1/accounts/:account_id
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = AccountRepository::new(state.db_pool.pool().clone());

    let deleted = repo
        .delete(account_id)
        .await
        .map_err(|e| internal_error("Failed to delete account", e))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Account"))
    }
}

/// An account's abuse-signal history
///
/// GET /api/v1/accounts/:account_id/health-events
pub async fn list_health_events(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<HealthEvent>>, ApiError> {
    let repo = HealthEventRepository::new(state.db_pool.pool().clone());

    let events = repo
        .list_by_account(account_id, 100)
        .await
        .map_err(|e| internal_error("Failed to list health events", e))?;

    Ok(Json(events))
}
