//! Property upload location check
//!
//! - POST /api/properties/validate

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{json_body, take_rows};
use crate::error::{ApiError, ApiResult};
use crate::property::{validate_properties, PropertyRowResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValidateResponse {
    pub results: Vec<PropertyRowResult>,
    pub summary: PropertySummary,
}

/// POST /api/properties/validate
pub async fn validate_property_upload(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PropertyValidateResponse>> {
    let mut body = json_body(payload)?;
    let rows = take_rows(&mut body, "properties")?;

    let max = state.max_batch_rows;
    if rows.len() > max {
        return Err(ApiError::PayloadTooLarge(format!(
            "Too many rows: {} (maximum {})",
            rows.len(),
            max
        )));
    }

    let results = validate_properties(&rows);
    let valid = results.iter().filter(|r| r.is_valid()).count();
    let summary = PropertySummary {
        total: results.len(),
        valid,
        invalid: results.len() - valid,
    };

    info!(total = summary.total, invalid = summary.invalid, "Property locations validated");

    Ok(Json(PropertyValidateResponse { results, summary }))
}

/// Build property upload routes
pub fn property_routes() -> Router<AppState> {
    Router::new().route("/api/properties/validate", post(validate_property_upload))
}
