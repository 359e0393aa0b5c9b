//! Application state shared across all handlers

use sea_orm::DatabaseConnection;

use crate::cache::Cache;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Advisory read-through cache; the database stays the source of truth
    pub cache: Cache,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            cache: Cache::new(),
        }
    }
}

// Allow handlers that only need the database to extract it directly
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for Cache {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}
