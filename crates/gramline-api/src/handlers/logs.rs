//! Message log handlers

use axum::{
    extract::{Query, State},
    Json,
};
use gramline_storage::models::MessageLog;
use gramline_storage::repository::MessageLogRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{default_limit, internal_error, ApiError};
use crate::auth::AppState;

/// Query parameters for listing message logs
#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    pub campaign_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Message log list response
#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub data: Vec<MessageLog>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregated send history, newest first
///
/// GET /api/v1/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<LogListResponse>, ApiError> {
    let repo = MessageLogRepository::new(state.db_pool.pool().clone());

    let data = repo
        .list(query.campaign_id, query.account_id, query.limit, query.offset)
        .await
        .map_err(|e| internal_error("Failed to list message logs", e))?;

    let total = repo
        .count(query.campaign_id, query.account_id)
        .await
        .unwrap_or(0);

    Ok(Json(LogListResponse {
        data,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}
