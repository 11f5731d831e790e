//! Well list upload endpoints
//!
//! - POST /api/users/:user_id/wells/validate
//! - POST /api/users/:user_id/wells/commit

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::info;

use super::{json_body, require_user_id, take_rows};
use crate::batch::{CommitRequest, CommitResponse, ValidateResponse};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/users/:user_id/wells/validate
///
/// Resolves every row without writing anything. Dropping the request
/// (client disconnect) or shutting down cancels rows still in flight.
pub async fn validate_wells(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ValidateResponse>> {
    let user_id = require_user_id(&user_id)?;
    let mut body = json_body(payload)?;
    let rows = take_rows(&mut body, "wells")?;

    info!(user_id, rows = rows.len(), "Validate request");

    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let response = state.orchestrator.validate(user_id, &rows, &cancel).await?;
    Ok(Json(response))
}

/// POST /api/users/:user_id/wells/commit
pub async fn commit_wells(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<CommitResponse>> {
    let user_id = require_user_id(&user_id)?;
    let body = json_body(payload)?;

    match body.get("wells") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(ApiError::BadRequest("\"wells\" must be an array".to_string())),
        None => return Err(ApiError::BadRequest("Missing \"wells\" array".to_string())),
    }

    let request: CommitRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid commit request: {}", e)))?;

    info!(
        user_id,
        rows = request.wells.len(),
        selections = request.selections.len(),
        "Commit request"
    );

    let response = state.orchestrator.commit(user_id, &request).await?;
    Ok(Json(response))
}

/// Build well upload routes
pub fn well_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/:user_id/wells/validate", post(validate_wells))
        .route("/api/users/:user_id/wells/commit", post(commit_wells))
}
