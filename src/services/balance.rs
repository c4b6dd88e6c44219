//! Per-site balance computation.
//!
//! Pure and synchronous: callers load the site's records and hand them in.
//! The result is deterministic and independent of record order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::site_invoice::PaymentBy;
use crate::models::{
    AdvancePurpose, AdvanceRecord, ExpenseRecord, FundsReceivedRecord, InvoiceRecord, SiteRecord,
};

/// Bucket an advance is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceBucket {
    /// Plain cash advance, subtracted from the site balance
    CashAdvance,
    /// Goods debited to the recipient, reported but not subtracted
    WorkerDebit,
}

/// Decides which bucket an advance purpose belongs to.
pub trait PurposeClassifier {
    fn bucket(&self, purpose: &AdvancePurpose) -> AdvanceBucket;
}

impl<F> PurposeClassifier for F
where
    F: Fn(&AdvancePurpose) -> AdvanceBucket,
{
    fn bucket(&self, purpose: &AdvancePurpose) -> AdvanceBucket {
        self(purpose)
    }
}

/// Allow-list of purpose codes counted as debits to the worker. Anything
/// not listed, including codes nobody has seen before, is a cash advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitPurposes {
    codes: HashSet<String>,
}

impl DebitPurposes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|code| AdvancePurpose::from_code(code.as_ref()).code().to_string())
                .collect(),
        }
    }

    /// Parses a comma-separated list such as `SAFETY_SHOES,TOOLS,OTHER`.
    pub fn parse_list(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim).filter(|code| !code.is_empty()))
    }

    pub fn contains(&self, purpose: &AdvancePurpose) -> bool {
        self.codes.contains(purpose.code())
    }
}

impl Default for DebitPurposes {
    fn default() -> Self {
        Self::new(["SAFETY_SHOES", "TOOLS", "OTHER"])
    }
}

impl PurposeClassifier for DebitPurposes {
    fn bucket(&self, purpose: &AdvancePurpose) -> AdvanceBucket {
        if self.contains(purpose) {
            AdvanceBucket::WorkerDebit
        } else {
            AdvanceBucket::CashAdvance
        }
    }
}

/// Records of one site, already filtered by `site_id`.
#[derive(Debug, Clone, Default)]
pub struct SiteLedger {
    pub expenses: Vec<ExpenseRecord>,
    pub advances: Vec<AdvanceRecord>,
    pub funds_received: Vec<FundsReceivedRecord>,
    pub invoices: Vec<InvoiceRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub funds_received: Decimal,
    pub total_expenditure: Decimal,
    /// Advances outside the debit purposes
    pub total_advances: Decimal,
    /// Advances with a debit purpose; not part of the balance
    pub debits_to_worker: Decimal,
    /// Net amount of supervisor-paid invoices
    pub invoices_paid: Decimal,
    /// Always zero
    pub pending_invoices: Decimal,
    pub total_balance: Decimal,
}

/// Computes the summary of `site_id`.
///
/// Returns an all-zero summary when `site_id` is not among `sites`.
pub fn compute_site_summary<C>(
    site_id: Uuid,
    sites: &[SiteRecord],
    ledger: &SiteLedger,
    classifier: &C,
) -> SiteSummary
where
    C: PurposeClassifier + ?Sized,
{
    if !sites.iter().any(|site| site.id == site_id) {
        return SiteSummary::default();
    }

    let funds_received: Decimal = ledger.funds_received.iter().map(|f| f.amount).sum();
    let total_expenditure: Decimal = ledger.expenses.iter().map(|e| e.amount).sum();

    let (mut total_advances, mut debits_to_worker) = (Decimal::ZERO, Decimal::ZERO);
    for advance in &ledger.advances {
        match classifier.bucket(&advance.purpose) {
            AdvanceBucket::CashAdvance => total_advances += advance.amount,
            AdvanceBucket::WorkerDebit => debits_to_worker += advance.amount,
        }
    }

    let invoices_paid: Decimal = ledger
        .invoices
        .iter()
        .filter(|invoice| invoice.payment_by == PaymentBy::Supervisor)
        .map(|invoice| invoice.net_amount)
        .sum();

    SiteSummary {
        funds_received,
        total_expenditure,
        total_advances,
        debits_to_worker,
        invoices_paid,
        pending_invoices: Decimal::ZERO,
        total_balance: funds_received - total_expenditure - total_advances - invoices_paid,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn scenario(site_id: Uuid) -> SiteLedger {
        SiteLedger {
            funds_received: vec![funds(site_id, dec!(10000))],
            expenses: vec![expense(site_id, dec!(2000)), expense(site_id, dec!(500))],
            advances: vec![
                advance(site_id, dec!(1000), "ADVANCE"),
                advance(site_id, dec!(300), "TOOLS"),
            ],
            invoices: vec![invoice(site_id, dec!(1500), PaymentBy::Supervisor)],
        }
    }

    #[test]
    fn worked_example_balances_to_5000() {
        let id = Uuid::new_v4();
        let summary =
            compute_site_summary(id, &[site(id)], &scenario(id), &DebitPurposes::default());

        assert_eq!(
            summary,
            SiteSummary {
                funds_received: dec!(10000),
                total_expenditure: dec!(2500),
                total_advances: dec!(1000),
                debits_to_worker: dec!(300),
                invoices_paid: dec!(1500),
                pending_invoices: Decimal::ZERO,
                total_balance: dec!(5000),
            }
        );
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        let id = Uuid::new_v4();
        let summary = compute_site_summary(
            id,
            &[site(id)],
            &SiteLedger::default(),
            &DebitPurposes::default(),
        );
        assert_eq!(summary, SiteSummary::default());
    }

    #[test]
    fn unknown_site_is_all_zero() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let summary =
            compute_site_summary(id, &[site(other)], &scenario(id), &DebitPurposes::default());
        assert_eq!(summary, SiteSummary::default());
    }

    #[test]
    fn head_office_invoices_do_not_count() {
        let id = Uuid::new_v4();
        let mut ledger = scenario(id);
        ledger
            .invoices
            .push(invoice(id, dec!(9999), PaymentBy::HeadOffice));

        let summary = compute_site_summary(id, &[site(id)], &ledger, &DebitPurposes::default());
        assert_eq!(summary.invoices_paid, dec!(1500));
        assert_eq!(summary.total_balance, dec!(5000));
    }

    #[test]
    fn unknown_purpose_is_a_cash_advance() {
        let id = Uuid::new_v4();
        let ledger = SiteLedger {
            advances: vec![advance(id, dec!(250), "UNIFORM")],
            ..Default::default()
        };

        let summary = compute_site_summary(id, &[site(id)], &ledger, &DebitPurposes::default());
        assert_eq!(summary.total_advances, dec!(250));
        assert_eq!(summary.debits_to_worker, Decimal::ZERO);
        assert_eq!(summary.total_balance, dec!(-250));
    }

    #[test]
    fn configured_debit_purposes_move_advances_between_buckets() {
        let id = Uuid::new_v4();
        let ledger = SiteLedger {
            advances: vec![
                advance(id, dec!(250), "UNIFORM"),
                advance(id, dec!(300), "TOOLS"),
            ],
            ..Default::default()
        };

        let purposes = DebitPurposes::parse_list("uniform, safety_shoes");
        let summary = compute_site_summary(id, &[site(id)], &ledger, &purposes);
        assert_eq!(summary.debits_to_worker, dec!(250));
        assert_eq!(summary.total_advances, dec!(300));
    }

    #[test]
    fn closures_classify_too() {
        let id = Uuid::new_v4();
        let everything_debits = |_: &AdvancePurpose| AdvanceBucket::WorkerDebit;
        let summary = compute_site_summary(id, &[site(id)], &scenario(id), &everything_debits);
        assert_eq!(summary.total_advances, Decimal::ZERO);
        assert_eq!(summary.debits_to_worker, dec!(1300));
        assert_eq!(summary.total_balance, dec!(6000));
    }

    #[test]
    fn decimals_are_not_rounded() {
        let id = Uuid::new_v4();
        let ledger = SiteLedger {
            funds_received: vec![funds(id, dec!(0.10)), funds(id, dec!(0.20))],
            expenses: vec![expense(id, dec!(0.05))],
            ..Default::default()
        };
        let summary = compute_site_summary(id, &[site(id)], &ledger, &DebitPurposes::default());
        assert_eq!(summary.funds_received, dec!(0.30));
        assert_eq!(summary.total_balance, dec!(0.25));
    }

    #[test]
    fn summary_serializes_camel_case() {
        let json = serde_json::to_value(SiteSummary::default()).unwrap();
        for key in [
            "fundsReceived",
            "totalExpenditure",
            "totalAdvances",
            "debitsToWorker",
            "invoicesPaid",
            "pendingInvoices",
            "totalBalance",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
