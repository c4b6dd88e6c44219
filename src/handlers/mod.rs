pub mod advances;
pub mod common;
pub mod expenses;
pub mod functions;
pub mod funds;
pub mod invoices;
pub mod sites;

use std::sync::Arc;

use crate::{
    cache::SummaryCache,
    config::AppConfig,
    db::DbPool,
    services::{
        advances::AdvanceService,
        expenses::ExpenseService,
        funds::{FundsService, FundsStore, SeaOrmFundsStore},
        invoices::InvoiceService,
        sites::SiteService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub sites: Arc<SiteService>,
    pub expenses: Arc<ExpenseService>,
    pub advances: Arc<AdvanceService>,
    pub funds: Arc<FundsService>,
    pub invoices: Arc<InvoiceService>,
    pub summary_cache: SummaryCache,
}

impl AppServices {
    /// Builds the container with the SeaORM funds store and an in-memory
    /// summary cache sized by `config`.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let store: Arc<dyn FundsStore> = Arc::new(SeaOrmFundsStore::new(db_pool.clone()));
        Self::with_funds_store(db_pool, config, store)
    }

    /// Same as [`AppServices::new`] with a caller supplied funds store.
    pub fn with_funds_store(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        funds_store: Arc<dyn FundsStore>,
    ) -> Self {
        let summary_cache = SummaryCache::in_memory(config.summary_cache_ttl());
        let debit_purposes = Arc::new(config.debit_purposes());

        Self {
            sites: Arc::new(SiteService::new(
                db_pool.clone(),
                summary_cache.clone(),
                debit_purposes,
            )),
            expenses: Arc::new(ExpenseService::new(db_pool.clone(), summary_cache.clone())),
            advances: Arc::new(AdvanceService::new(db_pool.clone(), summary_cache.clone())),
            funds: Arc::new(FundsService::new(
                db_pool.clone(),
                funds_store,
                config.funds_increment_mode(),
                summary_cache.clone(),
            )),
            invoices: Arc::new(InvoiceService::new(db_pool, summary_cache.clone())),
            summary_cache,
        }
    }
}
