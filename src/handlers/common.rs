use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::Serialize;

use crate::{errors::ServiceError, ApiResponse};

/// Unwraps a JSON body, reporting malformed payloads as 400 instead of
/// axum's default 422 text body.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ServiceError::BadRequest(rejection.body_text())),
    }
}

/// Standard created response
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}
