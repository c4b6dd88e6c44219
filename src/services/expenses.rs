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
    entities::expense,
    errors::ServiceError,
    models::coerce::{self, validate_non_negative, validate_not_blank},
    models::ExpenseRecord,
    services::sites::authorize_site,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 100, message = "category is required"), custom = "validate_not_blank")]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "coerce::deserialize_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "2000.00")]
    pub amount: Decimal,
    #[serde(deserialize_with = "coerce::deserialize_date")]
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Expense fields that may change after creation; `site_id` is not one of them.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateExpenseRequest {
    #[validate(length(min = 1, max = 100, message = "category must not be empty"), custom = "validate_not_blank")]
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_date")]
    pub expense_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct ExpenseService {
    db: Arc<DatabaseConnection>,
    cache: SummaryCache,
}

impl ExpenseService {
    pub fn new(db: Arc<DatabaseConnection>, cache: SummaryCache) -> Self {
        Self { db, cache }
    }

    #[instrument(skip(self, user, request))]
    pub async fn create(
        &self,
        user: &AuthUser,
        site_id: Uuid,
        request: CreateExpenseRequest,
    ) -> Result<ExpenseRecord, ServiceError> {
        request.validate()?;
        authorize_site(&*self.db, user, site_id).await?;

        let inserted = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            site_id: Set(site_id),
            category: Set(request.category.trim().to_string()),
            description: Set(coerce::non_blank(request.description)),
            amount: Set(request.amount),
            expense_date: Set(request.expense_date),
            remarks: Set(coerce::non_blank(request.remarks)),
            created_at: Set(Utc::now()),
            created_by: Set(user.user_id),
        }
        .insert(&*self.db)
        .await;
        // the row may be committed even when reading it back fails
        self.cache.invalidate(site_id).await;
        let model = inserted?;
        info!(expense_id = %model.id, %site_id, amount = %model.amount, "Expense recorded");
        Ok(model.into())
    }

    #[instrument(skip(self, user))]
    pub async fn list_for_site(
        &self,
        user: &AuthUser,
        site_id: Uuid,
    ) -> Result<Vec<ExpenseRecord>, ServiceError> {
        authorize_site(&*self.db, user, site_id).await?;

        let rows = expense::Entity::find()
            .filter(expense::Column::SiteId.eq(site_id))
            .order_by_desc(expense::Column::ExpenseDate)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(ExpenseRecord::from).collect())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        expense_id: Uuid,
        request: UpdateExpenseRequest,
    ) -> Result<ExpenseRecord, ServiceError> {
        request.validate()?;

        let existing = expense::Entity::find_by_id(expense_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Expense", expense_id))?;
        let site_id = existing.site_id;
        authorize_site(&*self.db, user, site_id).await?;

        let mut active: expense::ActiveModel = existing.into();
        if let Some(category) = request.category {
            active.category = Set(category.trim().to_string());
        }
        if request.description.is_some() {
            active.description = Set(coerce::non_blank(request.description));
        }
        if let Some(amount) = request.amount {
            active.amount = Set(amount);
        }
        if let Some(expense_date) = request.expense_date {
            active.expense_date = Set(expense_date);
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn create_request_coerces_amount_and_date() {
        let request: CreateExpenseRequest = serde_json::from_value(json!({
            "category": "cement",
            "amount": "2000",
            "expense_date": "2024-04-01"
        }))
        .unwrap();
        assert_eq!(request.amount, dec!(2000));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn negative_amount_is_rejected() {
        let request: CreateExpenseRequest = serde_json::from_value(json!({
            "category": "sand",
            "amount": -5,
            "expense_date": "2024-04-01"
        }))
        .unwrap();
        let err: ServiceError = request.validate().unwrap_err().into();
        assert_eq!(
            err.to_string(),
            "Validation error: amount: amount must not be negative"
        );
    }

    #[test]
    fn update_payload_cannot_move_expense_between_sites() {
        let err = serde_json::from_value::<UpdateExpenseRequest>(json!({
            "site_id": Uuid::new_v4(),
            "amount": 10
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown field `site_id`"));
    }
}
