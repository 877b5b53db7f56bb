//! Campaign handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use gramline_common::plans::validate_campaign_interval;
use gramline_common::types::CampaignStatus;
use gramline_storage::models::{Campaign, CreateCampaign, UpdateCampaign};
use gramline_storage::repository::{CampaignRepository, CustomerRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{default_limit, domain_error, internal_error, not_found, ApiError};
use crate::auth::AppState;

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Campaign list response
#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub data: Vec<Campaign>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for creating a campaign
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub customer_id: Uuid,
    pub name: String,
    pub message_template: String,
    pub interval_minutes: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Request body for updating a campaign
#[derive(Debug, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub message_template: Option<String>,
    pub interval_minutes: Option<i32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

fn validation_error(message: &str) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(super::ErrorResponse {
            error: "validation_error".to_string(),
            message: message.to_string(),
        }),
    )
}

/// List campaigns
///
/// GET /api/v1/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<CampaignListResponse>, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let status = query.status.and_then(|s| s.parse::<CampaignStatus>().ok());

    let data = repo
        .list(status, query.limit, query.offset)
        .await
        .map_err(|e| internal_error("Failed to list campaigns", e))?;

    let total = repo.count(status).await.unwrap_or(0);

    Ok(Json(CampaignListResponse {
        data,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Create a campaign
///
/// POST /api/v1/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    if input.name.is_empty() {
        return Err(validation_error("Campaign name is required"));
    }
    if input.message_template.is_empty() {
        return Err(validation_error("Message template is required"));
    }
    if input.interval_minutes <= 0 {
        return Err(validation_error("Interval must be positive"));
    }

    let customers = CustomerRepository::new(state.db_pool.pool().clone());
    let customer = customers
        .get(input.customer_id)
        .await
        .map_err(|e| internal_error("Failed to load customer", e))?
        .ok_or_else(|| not_found("Customer"))?;

    // Plan enforcement happens here, synchronously; it is never persisted
    validate_campaign_interval(input.interval_minutes as i64, &customer.plan)
        .map_err(domain_error)?;

    let repo = CampaignRepository::new(state.db_pool.pool().clone());
    let campaign = repo
        .create(CreateCampaign {
            customer_id: input.customer_id,
            name: input.name,
            message_template: input.message_template,
            interval_minutes: input.interval_minutes,
            start_at: input.start_at,
            end_at: input.end_at,
        })
        .await
        .map_err(|e| internal_error("Failed to create campaign", e))?;

    info!(campaign = %campaign.id, "Campaign created");

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// Get a campaign
///
/// GET /api/v1/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let campaign = repo
        .get(campaign_id)
        .await
        .map_err(|e| internal_error("Failed to load campaign", e))?
        .ok_or_else(|| not_found("Campaign"))?;

    Ok(Json(campaign))
}

/// Update a campaign
///
/// PUT /api/v1/campaigns/:campaign_id
pub async fn update_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
    Json(input): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let existing = repo
        .get(campaign_id)
        .await
        .map_err(|e| internal_error("Failed to load campaign", e))?
        .ok_or_else(|| not_found("Campaign"))?;

    if let Some(interval) = input.interval_minutes {
        if interval <= 0 {
            return Err(validation_error("Interval must be positive"));
        }

        let customers = CustomerRepository::new(state.db_pool.pool().clone());
        let customer = customers
            .get(existing.customer_id)
            .await
            .map_err(|e| internal_error("Failed to load customer", e))?
            .ok_or_else(|| not_found("Customer"))?;

        validate_campaign_interval(interval as i64, &customer.plan).map_err(domain_error)?;
    }

    let campaign = repo
        .update(
            campaign_id,
            UpdateCampaign {
                name: input.name,
                message_template: input.message_template,
                interval_minutes: input.interval_minutes,
                start_at: input.start_at,
                end_at: input.end_at,
            },
        )
        .await
        .map_err(|e| internal_error("Failed to update campaign", e))?
        .ok_or_else(|| not_found("Campaign"))?;

    Ok(Json(campaign))
}

/// Delete a draft campaign
///
/// DELETE /api/v1/campaigns/:campaign_id
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let deleted = repo
        .delete(campaign_id)
        .await
        .map_err(|e| internal_error("Failed to delete campaign", e))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Draft campaign"))
    }
}

async fn set_status(
    state: &AppState,
    campaign_id: Uuid,
    status: CampaignStatus,
) -> Result<Json<Campaign>, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let campaign = repo
        .update_status(campaign_id, status)
        .await
        .map_err(|e| internal_error("Failed to update campaign status", e))?
        .ok_or_else(|| not_found("Campaign"))?;

    info!(campaign = %campaign.id, status = %status, "Campaign status changed");

    Ok(Json(campaign))
}

/// Activate a campaign
///
/// POST /api/v1/campaigns/:campaign_id/activate
pub async fn activate_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    set_status(&state, campaign_id, CampaignStatus::Active).await
}

/// Pause a campaign.
///
/// Future due-checks skip it; an in-flight tick is not interrupted.
pub async fn pause_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    set_status(&state, campaign_id, CampaignStatus::Paused).await
}

/// Mark a campaign completed
///
/// POST /api/v1/campaigns/:campaign_id/complete
pub async fn complete_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    set_status(&state, campaign_id, CampaignStatus::Completed).await
}

/// Attach a group to a campaign
///
/// POST /api/v1/campaigns/:campaign_id/groups/:group_id
pub async fn attach_group(
    State(state): State<Arc<AppState>>,
    Path((campaign_id, group_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    repo.attach_group(campaign_id, group_id)
        .await
        .map_err(|e| internal_error("Failed to attach group", e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Detach a group from a campaign
///
/// DELETE /api/v1/campaigns/:campaign_id/groups/:group_id
pub async fn detach_group(
    State(state): State<Arc<AppState>>,
    Path((campaign_id, group_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let detached = repo
        .detach_group(campaign_id, group_id)
        .await
        .map_err(|e| internal_error("Failed to detach group", e))?;

    if detached {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Association"))
    }
}

/// Attach an account to a campaign
///
/// POST /api/v1/campaigns/:campaign_id/accounts/:account_id
pub async fn attach_account(
    State(state): State<Arc<AppState>>,
    Path((campaign_id, account_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    repo.attach_account(campaign_id, account_id)
        .await
        .map_err(|e| internal_error("Failed to attach account", e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Detach an account from a campaign
///
/// DELETE /api/v1/campaigns/:campaign_id/accounts/:account_id
pub async fn detach_account(
    State(state): State<Arc<AppState>>,
    Path((campaign_id, account_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let detached = repo
        .detach_account(campaign_id, account_id)
        .await
        .map_err(|e| internal_error("Failed to detach account", e))?;

    if detached {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Association"))
    }
}
