use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::service_error_response;
use crate::models::habit::HabitDto;
use crate::services::habit_service::{self, ReorderItem};
use crate::state::AppState;

pub async fn list_habits(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let habits = habit_service::get_habits_with_stats(&state.db, &state.cache, user_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "habits": habits })))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(payload): Json<HabitDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    let (habit, new_achievements) = habit_service::create_habit(&state.db, user_id, payload)
        .await
        .map_err(service_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "habit": habit,
            "new_achievements": new_achievements,
        })),
    ))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path((user_id, habit_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    habit_service::delete_habit(&state.db, &state.cache, user_id, habit_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "message": "Habit deleted" })))
}

pub async fn reorder_habits(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(items): Json<Vec<ReorderItem>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    habit_service::reorder_habits(&state.db, &state.cache, user_id, items)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "message": "Habits reordered" })))
}

pub async fn complete_habit(
    State(state): State<AppState>,
    Path((user_id, habit_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let outcome = habit_service::complete_habit(&state.db, &state.cache, user_id, habit_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({
        "already_completed": outcome.already_completed,
        "stats": outcome.stats,
        "new_achievements": outcome.new_achievements,
    })))
}

pub async fn uncomplete_habit(
    State(state): State<AppState>,
    Path((user_id, habit_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let outcome = habit_service::uncomplete_habit(&state.db, &state.cache, user_id, habit_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({
        "stats": outcome.stats,
    })))
}

pub async fn week_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let stats = habit_service::get_week_stats(&state.db, user_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({
        "completed": stats.completed,
        "total": stats.total,
    })))
}
