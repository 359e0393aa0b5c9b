pub mod achievements;
pub mod habits;
pub mod health;
pub mod stats;

use axum::{
    http::StatusCode,
    routing::{delete, get, patch, post},
    Router,
};

use crate::services::ServiceError;
use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Habits
        .route(
            "/users/:user_id/habits",
            get(habits::list_habits).post(habits::create_habit),
        )
        .route(
            "/users/:user_id/habits/reorder",
            patch(habits::reorder_habits),
        )
        .route(
            "/users/:user_id/habits/week-stats",
            get(habits::week_stats),
        )
        .route(
            "/users/:user_id/habits/:habit_id",
            delete(habits::delete_habit),
        )
        .route(
            "/users/:user_id/habits/:habit_id/complete",
            post(habits::complete_habit),
        )
        .route(
            "/users/:user_id/habits/:habit_id/uncomplete",
            post(habits::uncomplete_habit),
        )
        // Gamification
        .route("/users/:user_id/stats", get(stats::get_user_stats))
        .route(
            "/users/:user_id/achievements",
            get(achievements::list_achievements),
        )
        .with_state(state)
}

/// Map service errors onto HTTP responses.
pub fn service_error_response(err: ServiceError) -> (StatusCode, String) {
    match err {
        ServiceError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        ServiceError::InvalidState(msg) | ServiceError::LimitExceeded(msg) => {
            (StatusCode::BAD_REQUEST, msg)
        }
        ServiceError::Database(msg) => {
            tracing::error!("Database error: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    }
}
