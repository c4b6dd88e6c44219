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
    models::SiteRecord,
    services::{
        balance::SiteSummary,
        sites::{CreateSiteRequest, UpdateSiteRequest},
    },
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/sites",
    summary = "List sites",
    description = "All sites for admins; supervisors only see the sites assigned to them",
    responses(
        (status = 200, description = "Sites retrieved successfully", body = ApiResponse<Vec<SiteRecord>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Backend error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sites"
)]
pub async fn list_sites(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<SiteRecord>> {
    let sites = state.services.sites.list_visible(&auth_user).await?;
    Ok(Json(ApiResponse::success(sites)))
}

#[utoipa::path(
    post,
    path = "/api/v1/sites",
    summary = "Create site",
    description = "Create a site. Funds always start at zero",
    request_body = CreateSiteRequest,
    responses(
        (status = 201, description = "Site created successfully", body = ApiResponse<SiteRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "A site with this name already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sites"
)]
pub async fn create_site(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SiteRecord>>), ServiceError> {
    let request = json_body(payload)?;
    let site = state.services.sites.create(&auth_user, request).await?;
    Ok(created(site))
}

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}",
    summary = "Get site",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site retrieved successfully", body = ApiResponse<SiteRecord>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sites"
)]
pub async fn get_site(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SiteRecord> {
    let site = state.services.sites.get(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(site)))
}

#[utoipa::path(
    put,
    path = "/api/v1/sites/{id}",
    summary = "Update site",
    description = "Update site details. The funds total cannot be set here",
    params(("id" = Uuid, Path, description = "Site ID")),
    request_body = UpdateSiteRequest,
    responses(
        (status = 200, description = "Site updated successfully", body = ApiResponse<SiteRecord>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "A site with this name already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sites"
)]
pub async fn update_site(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateSiteRequest>, JsonRejection>,
) -> ApiResult<SiteRecord> {
    let request = json_body(payload)?;
    let site = state.services.sites.update(id, request).await?;
    Ok(Json(ApiResponse::success(site)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/summary",
    summary = "Site summary",
    description = "Aggregated expenses, advances, worker debits, funds received, invoices and balance",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<SiteSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to caller", body = crate::errors::ErrorResponse),
        (status = 500, description = "Backend error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sites"
)]
pub async fn get_site_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SiteSummary> {
    let summary = state.services.sites.summary(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    post,
    path = "/api/v1/sites/{id}/recompute-funds",
    summary = "Recompute site funds",
    description = "Reset the running funds total to the sum of the site's funds received rows",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Funds recomputed", body = ApiResponse<SiteRecord>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sites"
)]
pub async fn recompute_site_funds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SiteRecord> {
    let site = state.services.sites.recompute_funds(id).await?;
    Ok(Json(ApiResponse::with_message(site, "Funds recomputed from funds received")))
}
