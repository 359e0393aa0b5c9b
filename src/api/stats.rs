use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::service_error_response;
use crate::services::stats_service;
use crate::state::AppState;

pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let view = stats_service::get_stats_view(&state.db, &state.cache, user_id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(json!({ "stats": view })))
}
