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
    models::FundsReceivedRecord,
    services::funds::RecordFundsRequest,
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/funds",
    summary = "List funds received",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Funds received retrieved successfully", body = ApiResponse<Vec<FundsReceivedRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Funds"
)]
pub async fn list_funds_received(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Vec<FundsReceivedRecord>> {
    let rows = state.services.funds.list_for_site(&auth_user, site_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Records a receipt and bumps the site's running `funds` total through the
/// configured increment mode.
#[utoipa::path(
    post,
    path = "/api/v1/sites/{id}/funds",
    summary = "Record funds received",
    params(("id" = Uuid, Path, description = "Site ID")),
    request_body = RecordFundsRequest,
    responses(
        (status = 201, description = "Funds recorded", body = ApiResponse<FundsReceivedRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Funds"
)]
pub async fn record_funds_received(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
    payload: Result<Json<RecordFundsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<FundsReceivedRecord>>), ServiceError> {
    let request = json_body(payload)?;
    let record = state
        .services
        .funds
        .record_funds_received(&auth_user, site_id, request)
        .await?;
    Ok(created(record))
}
