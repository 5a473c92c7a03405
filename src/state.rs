//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::auth::CognitoAuth;
use crate::error::AppError;
use deadpool_postgres::{Object, Pool};
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Database connection pool
    pub db_pool: Pool,

    /// Token validation for the `/v1` routes
    pub auth: Arc<CognitoAuth>,

    /// Rendered OpenAPI document, `None` when disabled
    pub openapi_json: Option<String>,
}

impl AppState {
    pub fn new(db_pool: Pool, auth: Arc<CognitoAuth>, openapi_json: Option<String>) -> Self {
        Self {
            db_pool,
            auth,
            openapi_json,
        }
    }

    /// Check out a pooled connection
    pub async fn client(&self) -> Result<Object, AppError> {
        Ok(self.db_pool.get().await?)
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
