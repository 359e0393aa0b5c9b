use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::service_error_response;
use crate::services::achievement_service;
use crate::state::AppState;

pub async fn list_achievements(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let achievements = achievement_service::list_with_status(&state.db, user_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "achievements": achievements })))
}
