use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created, json_body};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::AdvanceRecord,
    services::advances::{CreateAdvanceRequest, UpdateAdvanceRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/advances",
    summary = "List advances",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Advances retrieved successfully", body = ApiResponse<Vec<AdvanceRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Advances"
)]
pub async fn list_advances(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Vec<AdvanceRecord>> {
    let advances = state
        .services
        .advances
        .list_for_site(&auth_user, site_id)
        .await?;
    Ok(Json(ApiResponse::success(advances)))
}

#[utoipa::path(
    post,
    path = "/api/v1/sites/{id}/advances",
    summary = "Record advance",
    description = "Record a cash advance or a worker debit. The purpose code decides which summary bucket the amount lands in",
    params(("id" = Uuid, Path, description = "Site ID")),
    request_body = CreateAdvanceRequest,
    responses(
        (status = 201, description = "Advance created successfully", body = ApiResponse<AdvanceRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Advances"
)]
pub async fn create_advance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
    payload: Result<Json<CreateAdvanceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AdvanceRecord>>), ServiceError> {
    let request = json_body(payload)?;
    let record = state
        .services
        .advances
        .create(&auth_user, site_id, request)
        .await?;
    Ok(created(record))
}

#[utoipa::path(
    put,
    path = "/api/v1/advances/{id}",
    summary = "Update advance",
    params(("id" = Uuid, Path, description = "Advance ID")),
    request_body = UpdateAdvanceRequest,
    responses(
        (status = 200, description = "Advance updated successfully", body = ApiResponse<AdvanceRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Advance not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Advances"
)]
pub async fn update_advance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateAdvanceRequest>, JsonRejection>,
) -> ApiResult<AdvanceRecord> {
    let request = json_body(payload)?;
    let record = state.services.advances.update(&auth_user, id, request).await?;
    Ok(Json(ApiResponse::success(record)))
}
