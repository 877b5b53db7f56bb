//! API routes

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use gramline_storage::DatabasePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AppState};
use crate::handlers::{accounts, campaigns, customers, groups, health, logs};

/// Create the API router
pub fn create_router(db_pool: DatabasePool, api_key: &str) -> Router {
    let state = Arc::new(AppState::new(db_pool, api_key));

    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .with_state(state.clone());

    // Customer routes
    let customer_routes = Router::new()
        .route("/", get(customers::list_customers))
        .route("/", post(customers::create_customer))
        .route("/:customer_id", get(customers::get_customer));

    // Campaign routes
    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/", post(campaigns::create_campaign))
        .route("/:campaign_id", get(campaigns::get_campaign))
        .route("/:campaign_id", put(campaigns::update_campaign))
        .route("/:campaign_id", delete(campaigns::delete_campaign))
        .route("/:campaign_id/activate", post(campaigns::activate_campaign))
        .route("/:campaign_id/pause", post(campaigns::pause_campaign))
        .route("/:campaign_id/complete", post(campaigns::complete_campaign))
        .route(
            "/:campaign_id/groups/:group_id",
            post(campaigns::attach_group),
        )
        .route(
            "/:campaign_id/groups/:group_id",
            delete(campaigns::detach_group),
        )
        .route(
            "/:campaign_id/accounts/:account_id",
            post(campaigns::attach_account),
        )
        .route(
            "/:campaign_id/accounts/:account_id",
            delete(campaigns::detach_account),
        );

    // Account routes
    let account_routes = Router::new()
        .route("/", get(accounts::list_accounts))
        .route("/", post(accounts::create_account))
        .route("/:account_id", get(accounts::get_account))
        .route("/:account_id", delete(accounts::delete_account))
        .route(
            "/:account_id/health-events",
            get(accounts::list_health_events),
        );

    // Group routes
    let group_routes = Router::new()
        .route("/", get(groups::list_groups))
        .route("/", post(groups::create_group))
        .route("/:group_id", get(groups::get_group))
        .route("/:group_id", delete(groups::delete_group));

    // Message log routes
    let log_routes = Router::new().route("/", get(logs::list_logs));

    // API v1 routes with authentication
    let api_v1 = Router::new()
        .nest("/customers", customer_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/accounts", account_routes)
        .nest("/groups", group_routes)
        .nest("/logs", log_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
}
