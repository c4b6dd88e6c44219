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
    models::ExpenseRecord,
    services::expenses::{CreateExpenseRequest, UpdateExpenseRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/expenses",
    summary = "List expenses",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Expenses retrieved successfully", body = ApiResponse<Vec<ExpenseRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Vec<ExpenseRecord>> {
    let rows = state.services.expenses.list_for_site(&auth_user, site_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/sites/{id}/expenses",
    summary = "Create expense",
    params(("id" = Uuid, Path, description = "Site ID")),
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<ExpenseRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseRecord>>), ServiceError> {
    let request = json_body(payload)?;
    let record = state
        .services
        .expenses
        .create(&auth_user, site_id, request)
        .await?;
    Ok(created(record))
}

#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    summary = "Update expense",
    params(("id" = Uuid, Path, description = "Expense ID")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated successfully", body = ApiResponse<ExpenseRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> ApiResult<ExpenseRecord> {
    let request = json_body(payload)?;
    let record = state.services.expenses.update(&auth_user, id, request).await?;
    Ok(Json(ApiResponse::success(record)))
}
