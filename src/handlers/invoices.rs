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
    models::InvoiceRecord,
    services::invoices::{CreateInvoiceRequest, UpdateInvoiceRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/invoices",
    summary = "List invoices",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Invoices retrieved successfully", body = ApiResponse<Vec<InvoiceRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Vec<InvoiceRecord>> {
    let rows = state.services.invoices.list_for_site(&auth_user, site_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/sites/{id}/invoices",
    summary = "Create invoice",
    description = "Create a site invoice. Only invoices paid by the supervisor count against the site balance",
    params(("id" = Uuid, Path, description = "Site ID")),
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created successfully", body = ApiResponse<InvoiceRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(site_id): Path<Uuid>,
    payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceRecord>>), ServiceError> {
    let request = json_body(payload)?;
    let record = state
        .services
        .invoices
        .create(&auth_user, site_id, request)
        .await?;
    Ok(created(record))
}

#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    summary = "Update invoice",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice updated successfully", body = ApiResponse<InvoiceRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateInvoiceRequest>, JsonRejection>,
) -> ApiResult<InvoiceRecord> {
    let request = json_body(payload)?;
    let record = state.services.invoices.update(&auth_user, id, request).await?;
    Ok(Json(ApiResponse::success(record)))
}
