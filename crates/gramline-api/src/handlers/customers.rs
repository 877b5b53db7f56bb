//! Customer handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gramline_common::plans::get_plan;
use gramline_storage::models::{CreateCustomer, Customer};
use gramline_storage::repository::CustomerRepository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{default_limit, domain_error, internal_error, not_found, ApiError};
use crate::auth::AppState;

/// Query parameters for listing customers
#[derive(Debug, Deserialize)]
pub struct ListCustomersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// List customers
///
/// GET /api/v1/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let repo = CustomerRepository::new(state.db_pool.pool().clone());

    let customers = repo
        .list(query.limit, query.offset)
        .await
        .map_err(|e| internal_error("Failed to list customers", e))?;

    Ok(Json(customers))
}

/// Create a customer
///
/// POST /api/v1/customers
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    // The plan must exist in the static table
    get_plan(&input.plan).map_err(domain_error)?;

    let repo = CustomerRepository::new(state.db_pool.pool().clone());

    let customer = repo
        .create(input)
        .await
        .map_err(|e| internal_error("Failed to create customer", e))?;

    info!(customer = %customer.id, "Customer created");

    Ok((StatusCode::CREATED, Json(customer)))
}

/// Get a customer
///
/// GET /api/v1/customers/:customer_id
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Customer>, ApiError> {
    let repo = CustomerRepository::new(state.db_pool.pool().clone());

    let customer = repo
        .get(customer_id)
        .await
        .map_err(|e| internal_error("Failed to load customer", e))?
        .ok_or_else(|| not_found("Customer"))?;

    Ok(Json(customer))
}
