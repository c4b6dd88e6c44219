use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    cache::SummaryCache,
    entities::{
        advance, expense, funds_received,
        site::{self, SiteStatus},
        site_invoice,
    },
    errors::ServiceError,
    models::{
        coerce::{self, validate_not_blank},
        SiteRecord,
    },
    services::balance::{compute_site_summary, DebitPurposes, SiteLedger, SiteSummary},
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSiteRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "location is required"), custom = "validate_not_blank")]
    pub location: String,
    #[serde(default)]
    pub status: Option<SiteStatus>,
    #[serde(default)]
    pub supervisor_id: Option<Uuid>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Site fields an admin may change. `funds` is absent: it only moves through
/// the funds increment path.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSiteRequest {
    #[validate(length(min = 1, max = 200, message = "name must not be empty"), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500, message = "location must not be empty"), custom = "validate_not_blank")]
    pub location: Option<String>,
    pub status: Option<SiteStatus>,
    /// A UUID assigns a supervisor; `null` unassigns; absent leaves it as is
    #[serde(default, deserialize_with = "coerce::deserialize_nullable")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub supervisor_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_date")]
    pub start_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

/// Loads `site_id` and checks the caller may see it.
pub(crate) async fn authorize_site<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    site_id: Uuid,
) -> Result<site::Model, ServiceError> {
    let site = site::Entity::find_by_id(site_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Site", site_id))?;

    if user.can_access_site(site.supervisor_id) {
        Ok(site)
    } else {
        warn!(user_id = %user.user_id, %site_id, "Site access denied");
        Err(ServiceError::Forbidden(format!(
            "Site {} is not assigned to you",
            site_id
        )))
    }
}

/// Service for sites, their visibility and summaries
#[derive(Clone)]
pub struct SiteService {
    db: Arc<DatabaseConnection>,
    cache: SummaryCache,
    debit_purposes: Arc<DebitPurposes>,
}

impl SiteService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cache: SummaryCache,
        debit_purposes: Arc<DebitPurposes>,
    ) -> Self {
        Self {
            db,
            cache,
            debit_purposes,
        }
    }

    #[instrument(skip(self, user, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        user: &AuthUser,
        request: CreateSiteRequest,
    ) -> Result<SiteRecord, ServiceError> {
        request.validate()?;

        let site_id = Uuid::new_v4();
        let model = site::ActiveModel {
            id: Set(site_id),
            name: Set(request.name.trim().to_string()),
            location: Set(request.location.trim().to_string()),
            status: Set(request.status.unwrap_or_default()),
            funds: Set(Decimal::ZERO),
            supervisor_id: Set(request.supervisor_id),
            start_date: Set(request.start_date),
            remarks: Set(coerce::non_blank(request.remarks)),
            created_at: Set(Utc::now()),
            created_by: Set(user.user_id),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::from_site_write)?;

        info!(%site_id, "Site created");
        Ok(model.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        site_id: Uuid,
        request: UpdateSiteRequest,
    ) -> Result<SiteRecord, ServiceError> {
        request.validate()?;

        let site = site::Entity::find_by_id(site_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Site", site_id))?;

        let mut active: site::ActiveModel = site.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(location) = request.location {
            active.location = Set(location.trim().to_string());
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if let Some(supervisor_id) = request.supervisor_id {
            active.supervisor_id = Set(supervisor_id);
        }
        if let Some(start_date) = request.start_date {
            active.start_date = Set(Some(start_date));
        }
        if request.remarks.is_some() {
            active.remarks = Set(coerce::non_blank(request.remarks));
        }

        let updated = active.update(&*self.db).await;
        self.cache.invalidate(site_id).await;
        let updated = updated.map_err(ServiceError::from_site_write)?;

        info!(%site_id, "Site updated");
        Ok(updated.into())
    }

    #[instrument(skip(self, user))]
    pub async fn get(&self, user: &AuthUser, site_id: Uuid) -> Result<SiteRecord, ServiceError> {
        authorize_site(&*self.db, user, site_id)
            .await
            .map(SiteRecord::from)
    }

    /// Sites the caller may see: all of them for admins, assigned ones for
    /// supervisors.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list_visible(&self, user: &AuthUser) -> Result<Vec<SiteRecord>, ServiceError> {
        let mut query = site::Entity::find().order_by_asc(site::Column::Name);
        if !user.is_admin() {
            // a user without a recognized role matches nothing
            let supervisor = user.supervisor_scope().unwrap_or_else(Uuid::nil);
            query = query.filter(site::Column::SupervisorId.eq(supervisor));
        }

        let sites = query.all(&*self.db).await?;
        Ok(sites.into_iter().map(SiteRecord::from).collect())
    }

    /// Balance summary of a site, served from the summary cache when fresh.
    #[instrument(skip(self, user))]
    pub async fn summary(&self, user: &AuthUser, site_id: Uuid) -> Result<SiteSummary, ServiceError> {
        let site = match authorize_site(&*self.db, user, site_id).await {
            Ok(site) => Some(SiteRecord::from(site)),
            // admins get the engine's all-zero summary for unknown sites
            Err(ServiceError::NotFound(_)) if user.is_admin() => None,
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::Forbidden(format!(
                    "Site {} is not assigned to you",
                    site_id
                )))
            }
            Err(err) => return Err(err),
        };

        if let Some(summary) = self.cache.get(site_id).await {
            return Ok(summary);
        }

        let generation = self.cache.generation(site_id);
        let sites: Vec<SiteRecord> = site.into_iter().collect();
        let ledger = if sites.is_empty() {
            SiteLedger::default()
        } else {
            load_ledger(&*self.db, site_id).await?
        };

        let summary = compute_site_summary(site_id, &sites, &ledger, self.debit_purposes.as_ref());
        if !sites.is_empty() {
            self.cache.put(site_id, generation, &summary).await;
        }
        Ok(summary)
    }

    /// Rebuilds the running `funds` total from the funds-received rows.
    #[instrument(skip(self))]
    pub async fn recompute_funds(&self, site_id: Uuid) -> Result<SiteRecord, ServiceError> {
        let site = site::Entity::find_by_id(site_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Site", site_id))?;

        let rows = funds_received::Entity::find()
            .filter(funds_received::Column::SiteId.eq(site_id))
            .all(&*self.db)
            .await?;
        let total: Decimal = rows.iter().map(|row| row.amount).sum();

        if total != site.funds {
            warn!(%site_id, cached = %site.funds, recomputed = %total, "Site funds drifted from funds received");
        }

        site::Entity::update_many()
            .col_expr(site::Column::Funds, Expr::value(total))
            .filter(site::Column::Id.eq(site_id))
            .exec(&*self.db)
            .await?;
        self.cache.invalidate(site_id).await;

        let mut record = SiteRecord::from(site);
        record.funds = total;
        Ok(record)
    }
}

/// Fetches every record of one site, filtered server-side.
pub(crate) async fn load_ledger<C: ConnectionTrait>(
    db: &C,
    site_id: Uuid,
) -> Result<SiteLedger, ServiceError> {
    let expenses = expense::Entity::find()
        .filter(expense::Column::SiteId.eq(site_id))
        .all(db)
        .await?;
    let advances = advance::Entity::find()
        .filter(advance::Column::SiteId.eq(site_id))
        .all(db)
        .await?;
    let funds_received = funds_received::Entity::find()
        .filter(funds_received::Column::SiteId.eq(site_id))
        .all(db)
        .await?;
    let invoices = site_invoice::Entity::find()
        .filter(site_invoice::Column::SiteId.eq(site_id))
        .all(db)
        .await?;

    Ok(SiteLedger {
        expenses: expenses.into_iter().map(Into::into).collect(),
        advances: advances.into_iter().map(Into::into).collect(),
        funds_received: funds_received.into_iter().map(Into::into).collect(),
        invoices: invoices.into_iter().map(Into::into).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_accepts_string_dates() {
        let request: CreateSiteRequest = serde_json::from_value(json!({
            "name": "Tower A",
            "location": "Hinjewadi",
            "start_date": "2024-06-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn update_request_rejects_funds() {
        let err = serde_json::from_value::<UpdateSiteRequest>(json!({ "funds": 100 })).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn blank_name_fails_validation() {
        let request = CreateSiteRequest {
            name: String::new(),
            location: "Baner".into(),
            status: None,
            supervisor_id: None,
            start_date: None,
            remarks: None,
        };
        let err: ServiceError = request.validate().unwrap_err().into();
        assert_eq!(err.to_string(), "Validation error: name: name is required");
    }

    #[test]
    fn whitespace_only_name_fails_validation() {
        let request: CreateSiteRequest =
            serde_json::from_value(json!({ "name": "   ", "location": "Baner" })).unwrap();
        let err: ServiceError = request.validate().unwrap_err().into();
        assert_eq!(err.to_string(), "Validation error: name: must not be blank");

        let update: UpdateSiteRequest =
            serde_json::from_value(json!({ "location": "\t" })).unwrap();
        let err: ServiceError = update.validate().unwrap_err().into();
        assert_eq!(err.to_string(), "Validation error: location: must not be blank");
    }

    #[test]
    fn update_request_distinguishes_unassign_from_absent() {
        let supervisor = Uuid::new_v4();
        let assign: UpdateSiteRequest =
            serde_json::from_value(json!({ "supervisor_id": supervisor })).unwrap();
        assert_eq!(assign.supervisor_id, Some(Some(supervisor)));

        let unassign: UpdateSiteRequest =
            serde_json::from_value(json!({ "supervisor_id": null })).unwrap();
        assert_eq!(unassign.supervisor_id, Some(None));

        let untouched: UpdateSiteRequest = serde_json::from_value(json!({ "name": "Tower B" })).unwrap();
        assert_eq!(untouched.supervisor_id, None);
    }
}
