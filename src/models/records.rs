//! camelCase view records returned by the API. Nullable text columns are
//! flattened through [`text_or_default`] so clients never see `null` there.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::coerce::text_or_default;
use super::purpose::AdvancePurpose;
use crate::entities::{
    advance::{self, RecipientType},
    expense, funds_received,
    site::{self, SiteStatus},
    site_invoice::{self, InvoiceStatus, PaymentBy},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub status: SiteStatus,
    /// Running total of funds received
    pub funds: Decimal,
    pub supervisor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl From<site::Model> for SiteRecord {
    fn from(model: site::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
            status: model.status,
            funds: model.funds,
            supervisor_id: model.supervisor_id,
            start_date: model.start_date,
            remarks: text_or_default(model.remarks),
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub category: String,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl From<expense::Model> for ExpenseRecord {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            site_id: model.site_id,
            category: model.category,
            description: text_or_default(model.description),
            amount: model.amount,
            expense_date: model.expense_date,
            remarks: text_or_default(model.remarks),
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub recipient_type: RecipientType,
    pub recipient_name: String,
    pub amount: Decimal,
    /// Purpose code, e.g. `ADVANCE`, `SAFETY_SHOES`, `TOOLS`, `OTHER`
    #[schema(value_type = String, example = "TOOLS")]
    pub purpose: AdvancePurpose,
    pub advance_date: NaiveDate,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl From<advance::Model> for AdvanceRecord {
    fn from(model: advance::Model) -> Self {
        Self {
            id: model.id,
            site_id: model.site_id,
            recipient_type: model.recipient_type,
            recipient_name: model.recipient_name,
            amount: model.amount,
            purpose: AdvancePurpose::from_code(&model.purpose),
            advance_date: model.advance_date,
            remarks: text_or_default(model.remarks),
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundsReceivedRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub amount: Decimal,
    pub received_date: NaiveDate,
    pub method: String,
    pub reference: String,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl From<funds_received::Model> for FundsReceivedRecord {
    fn from(model: funds_received::Model) -> Self {
        Self {
            id: model.id,
            site_id: model.site_id,
            amount: model.amount,
            received_date: model.received_date,
            method: text_or_default(model.method),
            reference: text_or_default(model.reference),
            remarks: text_or_default(model.remarks),
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub vendor_name: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub net_amount: Decimal,
    pub payment_by: PaymentBy,
    pub status: InvoiceStatus,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl From<site_invoice::Model> for InvoiceRecord {
    fn from(model: site_invoice::Model) -> Self {
        Self {
            id: model.id,
            site_id: model.site_id,
            vendor_name: model.vendor_name,
            invoice_number: model.invoice_number,
            invoice_date: model.invoice_date,
            net_amount: model.net_amount,
            payment_by: model.payment_by,
            status: model.status,
            remarks: text_or_default(model.remarks),
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}
