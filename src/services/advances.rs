use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    cache::SummaryCache,
    entities::advance::{self, RecipientType},
    errors::ServiceError,
    models::coerce::{self, validate_non_negative, validate_not_blank},
    models::{AdvancePurpose, AdvanceRecord},
    services::sites::authorize_site,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAdvanceRequest {
    pub recipient_type: RecipientType,
    #[validate(length(min = 1, max = 200, message = "recipient_name is required"), custom = "validate_not_blank")]
    pub recipient_name: String,
    #[serde(deserialize_with = "coerce::deserialize_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "1000")]
    pub amount: Decimal,
    /// Purpose code; defaults to `ADVANCE`
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "SAFETY_SHOES")]
    pub purpose: Option<AdvancePurpose>,
    #[serde(deserialize_with = "coerce::deserialize_date")]
    pub advance_date: NaiveDate,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateAdvanceRequest {
    pub recipient_type: Option<RecipientType>,
    #[validate(length(min = 1, max = 200, message = "recipient_name must not be empty"), custom = "validate_not_blank")]
    pub recipient_name: Option<String>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub purpose: Option<AdvancePurpose>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_date")]
    pub advance_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct AdvanceService {
    db: Arc<DatabaseConnection>,
    cache: SummaryCache,
}

impl AdvanceService {
    pub fn new(db: Arc<DatabaseConnection>, cache: SummaryCache) -> Self {
        Self { db, cache }
    }

    #[instrument(skip(self, user, request))]
    pub async fn create(
        &self,
        user: &AuthUser,
        site_id: Uuid,
        request: CreateAdvanceRequest,
    ) -> Result<AdvanceRecord, ServiceError> {
        request.validate()?;
        authorize_site(&*self.db, user, site_id).await?;

        let purpose = request.purpose.unwrap_or_default();
        let inserted = advance::ActiveModel {
            id: Set(Uuid::new_v4()),
            site_id: Set(site_id),
            recipient_type: Set(request.recipient_type),
            recipient_name: Set(request.recipient_name.trim().to_string()),
            amount: Set(request.amount),
            purpose: Set(purpose.code().to_string()),
            advance_date: Set(request.advance_date),
            remarks: Set(coerce::non_blank(request.remarks)),
            created_at: Set(Utc::now()),
            created_by: Set(user.user_id),
        }
        .insert(&*self.db)
        .await;
        // the row may be committed even when reading it back fails
        self.cache.invalidate(site_id).await;
        let model = inserted?;
        info!(advance_id = %model.id, %site_id, purpose = %purpose, "Advance recorded");
        Ok(model.into())
    }

    #[instrument(skip(self, user))]
    pub async fn list_for_site(
        &self,
        user: &AuthUser,
        site_id: Uuid,
    ) -> Result<Vec<AdvanceRecord>, ServiceError> {
        authorize_site(&*self.db, user, site_id).await?;

        let rows = advance::Entity::find()
            .filter(advance::Column::SiteId.eq(site_id))
            .order_by_desc(advance::Column::AdvanceDate)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(AdvanceRecord::from).collect())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        advance_id: Uuid,
        request: UpdateAdvanceRequest,
    ) -> Result<AdvanceRecord, ServiceError> {
        request.validate()?;

        let existing = advance::Entity::find_by_id(advance_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Advance", advance_id))?;
        let site_id = existing.site_id;
        authorize_site(&*self.db, user, site_id).await?;

        let mut active: advance::ActiveModel = existing.into();
        if let Some(recipient_type) = request.recipient_type {
            active.recipient_type = Set(recipient_type);
        }
        if let Some(recipient_name) = request.recipient_name {
            active.recipient_name = Set(recipient_name.trim().to_string());
        }
        if let Some(amount) = request.amount {
            active.amount = Set(amount);
        }
        if let Some(purpose) = request.purpose {
            active.purpose = Set(purpose.code().to_string());
        }
        if let Some(advance_date) = request.advance_date {
            active.advance_date = Set(advance_date);
        }
        if request.remarks.is_some() {
            active.remarks = Set(coerce::non_blank(request.remarks));
        }

        let updated = active.update(&*self.db).await;
        self.cache.invalidate(site_id).await;
        let updated = updated?;
        Ok(updated.into())
    }
}
