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
    entities::site_invoice::{self, InvoiceStatus, PaymentBy},
    errors::ServiceError,
    models::coerce::{self, validate_non_negative, validate_not_blank},
    models::InvoiceRecord,
    services::sites::authorize_site,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 200, message = "vendor_name is required"), custom = "validate_not_blank")]
    pub vendor_name: String,
    #[validate(length(min = 1, max = 100, message = "invoice_number is required"), custom = "validate_not_blank")]
    pub invoice_number: String,
    #[serde(deserialize_with = "coerce::deserialize_date")]
    pub invoice_date: NaiveDate,
    #[serde(deserialize_with = "coerce::deserialize_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "1500")]
    pub net_amount: Decimal,
    pub payment_by: PaymentBy,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, max = 200, message = "vendor_name must not be empty"), custom = "validate_not_blank")]
    pub vendor_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "invoice_number must not be empty"), custom = "validate_not_blank")]
    pub invoice_number: Option<String>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_date")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::deserialize_optional_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub net_amount: Option<Decimal>,
    pub payment_by: Option<PaymentBy>,
    pub status: Option<InvoiceStatus>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
    cache: SummaryCache,
}

impl InvoiceService {
    pub fn new(db: Arc<DatabaseConnection>, cache: SummaryCache) -> Self {
        Self { db, cache }
    }

    #[instrument(skip(self, user, request), fields(invoice_number = %request.invoice_number))]
    pub async fn create(
        &self,
        user: &AuthUser,
        site_id: Uuid,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceRecord, ServiceError> {
        request.validate()?;
        authorize_site(&*self.db, user, site_id).await?;

        let inserted = site_invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            site_id: Set(site_id),
            vendor_name: Set(request.vendor_name.trim().to_string()),
            invoice_number: Set(request.invoice_number.trim().to_string()),
            invoice_date: Set(request.invoice_date),
            net_amount: Set(request.net_amount),
            payment_by: Set(request.payment_by),
            status: Set(request.status.unwrap_or_default()),
            remarks: Set(coerce::non_blank(request.remarks)),
            created_at: Set(Utc::now()),
            created_by: Set(user.user_id),
        }
        .insert(&*self.db)
        .await;
        // the row may be committed even when reading it back fails
        self.cache.invalidate(site_id).await;
        let model = inserted?;
        info!(invoice_id = %model.id, %site_id, "Invoice recorded");
        Ok(model.into())
    }

    #[instrument(skip(self, user))]
    pub async fn list_for_site(
        &self,
        user: &AuthUser,
        site_id: Uuid,
    ) -> Result<Vec<InvoiceRecord>, ServiceError> {
        authorize_site(&*self.db, user, site_id).await?;

        let rows = site_invoice::Entity::find()
            .filter(site_invoice::Column::SiteId.eq(site_id))
            .order_by_desc(site_invoice::Column::InvoiceDate)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(InvoiceRecord::from).collect())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        invoice_id: Uuid,
        request: UpdateInvoiceRequest,
    ) -> Result<InvoiceRecord, ServiceError> {
        request.validate()?;

        let existing = site_invoice::Entity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;
        let site_id = existing.site_id;
        authorize_site(&*self.db, user, site_id).await?;

        let mut active: site_invoice::ActiveModel = existing.into();
        if let Some(vendor_name) = request.vendor_name {
            active.vendor_name = Set(vendor_name.trim().to_string());
        }
        if let Some(invoice_number) = request.invoice_number {
            active.invoice_number = Set(invoice_number.trim().to_string());
        }
        if let Some(invoice_date) = request.invoice_date {
            active.invoice_date = Set(invoice_date);
        }
        if let Some(net_amount) = request.net_amount {
            active.net_amount = Set(net_amount);
        }
        if let Some(payment_by) = request.payment_by {
            active.payment_by = Set(payment_by);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if request.remarks.is_some() {
            active.remarks = Set(coerce::non_blank(request.remarks));
        }

        let updated = active.update(&*self.db).await;
        self.cache.invalidate(site_id).await;
        let updated = updated?;
        info!(%invoice_id, %site_id, "Invoice updated");
        Ok(updated.into())
    }
}
