use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A construction site. `funds` is a running total of funds received,
/// maintained by the increment path rather than derived on read.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub location: String,
    pub status: SiteStatus,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub funds: Decimal,
    pub supervisor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::advance::Entity")]
    Advances,
    #[sea_orm(has_many = "super::funds_received::Entity")]
    FundsReceived,
    #[sea_orm(has_many = "super::site_invoice::Entity")]
    Invoices,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::advance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advances.def()
    }
}

impl Related<super::funds_received::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FundsReceived.def()
    }
}

impl Related<super::site_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Lifecycle status of a site
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "completed")]
    Completed,
}
