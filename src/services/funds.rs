//! Funds received and the site's running `funds` total.
//!
//! In [`FundsIncrementMode::ReadModifyWrite`] the total is read, summed and
//! written back as separate statements, so two concurrent increments of the
//! same site can lose one of them. [`FundsIncrementMode::Atomic`] issues a
//! single `funds = funds + amount` update instead.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    cache::SummaryCache,
    entities::{funds_received, site},
    errors::ServiceError,
    models::coerce::{self, validate_positive},
    models::{FundsReceivedRecord, SiteRecord},
    services::sites::authorize_site,
    tracing::with_metrics,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum FundsIncrementMode {
    /// Read, add, write back. Concurrent increments may be lost.
    #[default]
    ReadModifyWrite,
    /// One `UPDATE ... SET funds = funds + $1` inside a transaction.
    Atomic,
}

/// Running total before and after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsChange {
    pub previous_funds: Decimal,
    pub new_funds: Decimal,
}

/// Storage of the per-site running funds total.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundsStore: Send + Sync {
    /// Current total, `None` for an unknown site.
    async fn current_funds(&self, site_id: Uuid) -> Result<Option<Decimal>, ServiceError>;

    /// Overwrites the total.
    async fn store_funds(&self, site_id: Uuid, funds: Decimal) -> Result<(), ServiceError>;

    /// Adds `amount` in one step, `None` for an unknown site.
    async fn add_funds(
        &self,
        site_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<FundsChange>, ServiceError>;
}

/// Increments the running total of `site_id` by `amount` using `mode`.
pub async fn increment_funds<S>(
    store: &S,
    mode: FundsIncrementMode,
    site_id: Uuid,
    amount: Decimal,
) -> Result<FundsChange, ServiceError>
where
    S: FundsStore + ?Sized,
{
    let change = match mode {
        FundsIncrementMode::ReadModifyWrite => {
            let previous_funds = store
                .current_funds(site_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Site", site_id))?;
            let new_funds = previous_funds + amount;
            store.store_funds(site_id, new_funds).await?;
            FundsChange {
                previous_funds,
                new_funds,
            }
        }
        FundsIncrementMode::Atomic => store
            .add_funds(site_id, amount)
            .await?
            .ok_or_else(|| ServiceError::not_found("Site", site_id))?,
    };

    counter!("sitebook.funds.increments", 1, "mode" => mode.to_string());
    Ok(change)
}

/// [`FundsStore`] over the `sites.funds` column.
#[derive(Clone)]
pub struct SeaOrmFundsStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmFundsStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FundsStore for SeaOrmFundsStore {
    async fn current_funds(&self, site_id: Uuid) -> Result<Option<Decimal>, ServiceError> {
        let site = site::Entity::find_by_id(site_id).one(&*self.db).await?;
        Ok(site.map(|site| site.funds))
    }

    async fn store_funds(&self, site_id: Uuid, funds: Decimal) -> Result<(), ServiceError> {
        site::Entity::update_many()
            .col_expr(site::Column::Funds, Expr::value(funds))
            .filter(site::Column::Id.eq(site_id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    async fn add_funds(
        &self,
        site_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<FundsChange>, ServiceError> {
        let txn = self.db.begin().await?;

        let result = site::Entity::update_many()
            .col_expr(
                site::Column::Funds,
                Expr::col(site::Column::Funds).add(amount),
            )
            .filter(site::Column::Id.eq(site_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let new_funds = site::Entity::find_by_id(site_id)
            .one(&txn)
            .await?
            .map(|site| site.funds)
            .ok_or_else(|| ServiceError::not_found("Site", site_id))?;
        txn.commit().await?;

        Ok(Some(FundsChange {
            previous_funds: new_funds - amount,
            new_funds,
        }))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordFundsRequest {
    #[serde(deserialize_with = "coerce::deserialize_amount")]
    #[validate(custom = "validate_positive")]
    #[schema(value_type = String, example = "10000")]
    pub amount: Decimal,
    #[serde(deserialize_with = "coerce::deserialize_date")]
    pub received_date: NaiveDate,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Outcome of a direct funds increment.
#[derive(Debug, Clone)]
pub struct AddFundsOutcome {
    pub site: SiteRecord,
    pub change: FundsChange,
}

#[derive(Clone)]
pub struct FundsService {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn FundsStore>,
    mode: FundsIncrementMode,
    cache: SummaryCache,
}

impl FundsService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn FundsStore>,
        mode: FundsIncrementMode,
        cache: SummaryCache,
    ) -> Self {
        Self {
            db,
            store,
            mode,
            cache,
        }
    }

    pub fn mode(&self) -> FundsIncrementMode {
        self.mode
    }

    /// Inserts a funds-received row, then increments the site's running total.
    #[instrument(skip(self, user, request), fields(amount = %request.amount))]
    pub async fn record_funds_received(
        &self,
        user: &AuthUser,
        site_id: Uuid,
        request: RecordFundsRequest,
    ) -> Result<FundsReceivedRecord, ServiceError> {
        request.validate()?;
        authorize_site(&*self.db, user, site_id).await?;

        let inserted = funds_received::ActiveModel {
            id: Set(Uuid::new_v4()),
            site_id: Set(site_id),
            amount: Set(request.amount),
            received_date: Set(request.received_date),
            method: Set(coerce::non_blank(request.method)),
            reference: Set(coerce::non_blank(request.reference)),
            remarks: Set(coerce::non_blank(request.remarks)),
            created_at: Set(Utc::now()),
            created_by: Set(user.user_id),
        }
        .insert(&*self.db)
        .await;
        // the row may be committed even when reading it back fails
        self.cache.invalidate(site_id).await;
        let model = inserted?;

        // the row is already stored; a failed increment leaves sites.funds
        // behind until the next recompute
        if let Err(err) = increment_funds(self.store.as_ref(), self.mode, site_id, model.amount).await
        {
            warn!(%site_id, error = %err, "Funds recorded but running total not updated");
            return Err(err);
        }

        info!(funds_id = %model.id, %site_id, "Funds received recorded");
        Ok(model.into())
    }

    #[instrument(skip(self, user))]
    pub async fn list_for_site(
        &self,
        user: &AuthUser,
        site_id: Uuid,
    ) -> Result<Vec<FundsReceivedRecord>, ServiceError> {
        authorize_site(&*self.db, user, site_id).await?;

        let rows = funds_received::Entity::find()
            .filter(funds_received::Column::SiteId.eq(site_id))
            .order_by_desc(funds_received::Column::ReceivedDate)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(FundsReceivedRecord::from).collect())
    }

    /// Increments the running total directly and returns the updated site.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn add_funds(
        &self,
        site_id: Uuid,
        amount: Decimal,
    ) -> Result<AddFundsOutcome, ServiceError> {
        with_metrics("add_funds", || async {
            let change = increment_funds(self.store.as_ref(), self.mode, site_id, amount).await;
            self.cache.invalidate(site_id).await;
            let change = change?;

            let site = site::Entity::find_by_id(site_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Site", site_id))?;

            info!(
                %site_id,
                previous_funds = %change.previous_funds,
                new_funds = %change.new_funds,
                "Site funds incremented"
            );
            Ok(AddFundsOutcome {
                site: site.into(),
                change,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    #[test]
    fn mode_parses_from_config_strings() {
        assert_eq!(
            "read-modify-write".parse::<FundsIncrementMode>().unwrap(),
            FundsIncrementMode::ReadModifyWrite
        );
        assert_eq!(
            "ATOMIC".parse::<FundsIncrementMode>().unwrap(),
            FundsIncrementMode::Atomic
        );
        assert!("eventual".parse::<FundsIncrementMode>().is_err());
        assert_eq!(
            FundsIncrementMode::default().to_string(),
            "read-modify-write"
        );
    }

    #[tokio::test]
    async fn read_modify_write_reads_then_stores_sum() {
        let site_id = Uuid::new_v4();
        let mut store = MockFundsStore::new();
        store
            .expect_current_funds()
            .with(eq(site_id))
            .times(1)
            .returning(|_| Ok(Some(dec!(500))));
        store
            .expect_store_funds()
            .with(eq(site_id), eq(dec!(750)))
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_add_funds().never();

        let change = increment_funds(&store, FundsIncrementMode::ReadModifyWrite, site_id, dec!(250))
            .await
            .unwrap();
        assert_eq!(
            change,
            FundsChange {
                previous_funds: dec!(500),
                new_funds: dec!(750)
            }
        );
    }

    #[tokio::test]
    async fn atomic_mode_uses_single_update() {
        let site_id = Uuid::new_v4();
        let mut store = MockFundsStore::new();
        store.expect_current_funds().never();
        store.expect_store_funds().never();
        store
            .expect_add_funds()
            .with(eq(site_id), eq(dec!(100)))
            .times(1)
            .returning(|_, amount| {
                Ok(Some(FundsChange {
                    previous_funds: dec!(0),
                    new_funds: amount,
                }))
            });

        let change = increment_funds(&store, FundsIncrementMode::Atomic, site_id, dec!(100))
            .await
            .unwrap();
        assert_eq!(change.new_funds, dec!(100));
    }

    #[tokio::test]
    async fn unknown_site_is_not_found_in_both_modes() {
        let site_id = Uuid::new_v4();
        let mut store = MockFundsStore::new();
        store.expect_current_funds().returning(|_| Ok(None));
        store.expect_add_funds().returning(|_, _| Ok(None));
        store.expect_store_funds().never();

        for mode in [FundsIncrementMode::ReadModifyWrite, FundsIncrementMode::Atomic] {
            let err = increment_funds(&store, mode, site_id, dec!(1)).await.unwrap_err();
            assert_eq!(err.to_string(), format!("Not found: Site {} not found", site_id));
        }
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let mut store = MockFundsStore::new();
        store
            .expect_current_funds()
            .returning(|_| Ok(Some(dec!(0))));
        store
            .expect_store_funds()
            .returning(|_, _| Err(ServiceError::DatabaseError(sea_orm::DbErr::Custom("disk full".into()))));

        let err = increment_funds(
            &store,
            FundsIncrementMode::ReadModifyWrite,
            Uuid::new_v4(),
            dec!(5),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
