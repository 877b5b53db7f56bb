//! Authentication module - static API key

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use gramline_storage::DatabasePool;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabasePool,
    /// SHA-256 digest of the configured API key
    api_key_digest: [u8; 32],
}

impl AppState {
    /// Build the state from the pool and the configured static key
    pub fn new(db_pool: DatabasePool, api_key: &str) -> Self {
        Self {
            db_pool,
            api_key_digest: digest(api_key),
        }
    }

    /// Compare a presented key against the configured one.
    ///
    /// Digests are compared rather than raw strings so the comparison does
    /// not leak key length or prefix timing.
    pub fn key_matches(&self, presented: &str) -> bool {
        digest(presented) == self.api_key_digest
    }
}

fn digest(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

/// Extract API key from request
pub fn extract_api_key(req: &Request) -> Option<&str> {
    // Check Authorization header
    if let Some(auth) = req.headers().get("authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token);
            }
        }
    }

    // Check X-API-Key header
    if let Some(key) = req.headers().get("x-api-key") {
        if let Ok(key_str) = key.to_str() {
            return Some(key_str);
        }
    }

    None
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Health endpoints stay open
    if request.uri().path().starts_with("/health") {
        return Ok(next.run(request).await);
    }

    let api_key = extract_api_key(&request).ok_or_else(|| {
        warn!("Missing API key in request to {}", request.uri().path());
        StatusCode::UNAUTHORIZED
    })?;

    if !state.key_matches(api_key) {
        warn!("API key mismatch for {}", request.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_is_accepted() {
        let digest_a = digest("gl_secret");
        let digest_b = digest("gl_secret");
        assert_eq!(digest_a, digest_b);
    }

    #[test]
    fn different_keys_produce_different_digests() {
        assert_ne!(digest("gl_secret"), digest("gl_other"));
        assert_ne!(digest("gl_secret"), digest("gl_secre"));
    }
}
