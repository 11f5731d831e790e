//! HTTP API handlers for mrp-wr

pub mod health;
pub mod properties;
pub mod wells;

pub use health::health_routes;
pub use properties::property_routes;
pub use wells::well_routes;

use crate::columns::RawRow;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

/// Unwrap a JSON body, turning extractor rejections into a 400
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Take the array of row objects stored under `field`
pub(crate) fn take_rows(body: &mut Value, field: &str) -> ApiResult<Vec<RawRow>> {
    let rows = match body.get_mut(field).map(Value::take) {
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(ApiError::BadRequest(format!("\"{}\" must be an array", field))),
        None => return Err(ApiError::BadRequest(format!("Missing \"{}\" array", field))),
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(map) => Ok(map),
            _ => Err(ApiError::BadRequest(format!(
                "Row {} in \"{}\" is not an object",
                index + 1,
                field
            ))),
        })
        .collect()
}

/// Reject blank user ids from the path
pub(crate) fn require_user_id(user_id: &str) -> ApiResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Missing user id".to_string()));
    }
    Ok(trimmed)
}
