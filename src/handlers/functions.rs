//! Function-style endpoints. These keep a flat contract: the success body is
//! a plain object and failures are `{ "error": "..." }`, never the
//! [`crate::errors::ErrorResponse`] envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{coerce, SiteRecord},
    AppState,
};

const MISSING_INPUT: &str = "site_id and amount are required";
const INVALID_SITE_ID: &str = "site_id must be a valid UUID";
const INVALID_AMOUNT: &str = "amount must be a positive number";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AddFundsRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub site_id: Option<Value>,
    /// Number or numeric string
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2500")]
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddFundsResponse {
    pub success: bool,
    pub data: SiteRecord,
    pub previous_funds: Decimal,
    pub new_funds: Decimal,
}

/// Error body of function endpoints.
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({ "error": "site_id and amount are required" }))]
pub struct FunctionError {
    pub error: String,
}

fn is_absent(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Validates the raw add-funds input before any backend call.
fn parse_add_funds(request: &AddFundsRequest) -> Result<(Uuid, Decimal), ApiError> {
    if is_absent(&request.site_id) || is_absent(&request.amount) {
        return Err(ApiError::bad_request(MISSING_INPUT));
    }

    let site_id = request
        .site_id
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or_else(|| ApiError::bad_request(INVALID_SITE_ID))?;

    let amount = request
        .amount
        .as_ref()
        .and_then(|raw| coerce::parse_amount(raw).ok())
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| ApiError::bad_request(INVALID_AMOUNT))?;

    if let Err(err) = coerce::validate_storable(&amount) {
        let message = err
            .message
            .map(|message| message.into_owned())
            .unwrap_or_else(|| INVALID_AMOUNT.to_string());
        return Err(ApiError::bad_request(message));
    }

    Ok((site_id, amount))
}

#[utoipa::path(
    post,
    path = "/api/v1/functions/add-funds",
    summary = "Increment site funds",
    description = "Add `amount` to a site's running funds total using the configured increment mode",
    request_body = AddFundsRequest,
    responses(
        (status = 200, description = "Funds incremented", body = AddFundsResponse),
        (status = 400, description = "Missing or invalid site_id/amount", body = FunctionError),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Backend failure, including an unknown site", body = FunctionError)
    ),
    security(("Bearer" = [])),
    tag = "Functions"
)]
pub async fn add_funds(
    State(state): State<AppState>,
    payload: Result<Json<AddFundsRequest>, JsonRejection>,
) -> Result<Json<AddFundsResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected add-funds body");
            return Err(ApiError::bad_request(MISSING_INPUT));
        }
    };
    let (site_id, amount) = parse_add_funds(&request)?;

    let outcome = state
        .services
        .funds
        .add_funds(site_id, amount)
        .await
        .map_err(ApiError::backend)?;

    info!(%site_id, %amount, "add-funds completed");
    Ok(Json(AddFundsResponse {
        success: true,
        data: outcome.site,
        previous_funds: outcome.change.previous_funds,
        new_funds: outcome.change.new_funds,
    }))
}
