//! Gramline API - administrative REST surface
//!
//! Thin CRUD over campaigns, accounts, groups, and message logs,
//! authenticated by a static API key.

pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
