use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sitebook API",
        version = "1.0.0",
        description = r#"
# Sitebook Site Ledger API

Bookkeeping for construction sites: expenses, advances to workers,
funds received from head office and site invoices, with a per-site
balance summary.

## Authentication

Every ledger endpoint requires a JWT bearer token carrying an `admin` or
`supervisor` role:

```
Authorization: Bearer <your-jwt-token>
```

Supervisors only see and write to the sites assigned to them.

## Amounts

Amounts are decimal values serialized as strings. Requests accept either
a JSON number or a numeric string.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Sites", description = "Sites, visibility and balance summaries"),
        (name = "Expenses", description = "Site expenses"),
        (name = "Advances", description = "Cash advances and worker debits"),
        (name = "Funds", description = "Funds received from head office"),
        (name = "Invoices", description = "Site invoices"),
        (name = "Functions", description = "Function-style endpoints with a flat error contract")
    ),
    paths(
        // Sites
        crate::handlers::sites::list_sites,
        crate::handlers::sites::create_site,
        crate::handlers::sites::get_site,
        crate::handlers::sites::update_site,
        crate::handlers::sites::get_site_summary,
        crate::handlers::sites::recompute_site_funds,

        // Ledger
        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::advances::list_advances,
        crate::handlers::advances::create_advance,
        crate::handlers::advances::update_advance,
        crate::handlers::funds::list_funds_received,
        crate::handlers::funds::record_funds_received,
        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::update_invoice,

        // Functions
        crate::handlers::functions::add_funds,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::models::SiteRecord,
            crate::models::ExpenseRecord,
            crate::models::AdvanceRecord,
            crate::models::FundsReceivedRecord,
            crate::models::InvoiceRecord,
            crate::services::balance::SiteSummary,
            crate::handlers::functions::AddFundsRequest,
            crate::handlers::functions::AddFundsResponse,
            crate::handlers::functions::FunctionError,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Sitebook API"));
        assert!(json.contains("/api/v1/sites/{id}/summary"));
        assert!(json.contains("/api/v1/functions/add-funds"));
        assert!(json.contains("\"Bearer\""));
    }
}
