//! Services Layer
//!
//! Pure business logic for the habit gamification engine, called from the
//! Axum handlers. Services take the database connection (and cache where
//! relevant) as arguments so tests can drive them directly.

pub mod achievement_service;
pub mod habit_service;
pub mod stats_service;
pub mod streak;

/// Calendar-day format used for completion dates and streak bookkeeping.
pub const DATE_FMT: &str = "%Y-%m-%d";

/// Error type for service operations
#[derive(Debug)]
pub enum ServiceError {
    Database(String),
    NotFound,
    InvalidState(String),
    /// A configured limit was hit (e.g. max habits per user)
    LimitExceeded(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Database(msg) => write!(f, "Database error: {}", msg),
            ServiceError::NotFound => write!(f, "Resource not found"),
            ServiceError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            ServiceError::LimitExceeded(msg) => write!(f, "Limit exceeded: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Database(e.to_string())
    }
}
