//! Property-based tests for the site balance engine.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use sitebook_api::{
    entities::{
        advance::RecipientType,
        site::SiteStatus,
        site_invoice::{InvoiceStatus, PaymentBy},
    },
    models::{AdvancePurpose, AdvanceRecord, ExpenseRecord, FundsReceivedRecord, InvoiceRecord, SiteRecord},
    services::balance::{compute_site_summary, DebitPurposes, SiteLedger, SiteSummary},
};
use uuid::Uuid;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn site(id: Uuid) -> SiteRecord {
    SiteRecord {
        id,
        name: "Riverside Block C".to_string(),
        location: "Nashik".to_string(),
        status: SiteStatus::Active,
        funds: Decimal::ZERO,
        supervisor_id: None,
        start_date: None,
        remarks: String::new(),
        created_at: Utc::now(),
        created_by: Uuid::nil(),
    }
}

// Amounts in paise, two decimal places like the money columns
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000).prop_map(|paise| Decimal::new(paise, 2))
}

fn purpose_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ADVANCE".to_string()),
        Just("SAFETY_SHOES".to_string()),
        Just("TOOLS".to_string()),
        Just("OTHER".to_string()),
        Just("".to_string()),
        "[A-Z_]{3,12}",
    ]
}

fn ledger_strategy(site_id: Uuid) -> impl Strategy<Value = SiteLedger> {
    (
        prop::collection::vec(amount_strategy(), 0..8),
        prop::collection::vec((amount_strategy(), purpose_strategy()), 0..8),
        prop::collection::vec(amount_strategy(), 0..8),
        prop::collection::vec((amount_strategy(), any::<bool>()), 0..8),
    )
        .prop_map(move |(expenses, advances, funds, invoices)| SiteLedger {
            expenses: expenses
                .into_iter()
                .map(|amount| ExpenseRecord {
                    id: Uuid::new_v4(),
                    site_id,
                    category: "MATERIAL".to_string(),
                    description: String::new(),
                    amount,
                    expense_date: day(),
                    remarks: String::new(),
                    created_at: Utc::now(),
                    created_by: Uuid::nil(),
                })
                .collect(),
            advances: advances
                .into_iter()
                .map(|(amount, purpose)| AdvanceRecord {
                    id: Uuid::new_v4(),
                    site_id,
                    recipient_type: RecipientType::Worker,
                    recipient_name: "Ramesh".to_string(),
                    amount,
                    purpose: AdvancePurpose::from_code(&purpose),
                    advance_date: day(),
                    remarks: String::new(),
                    created_at: Utc::now(),
                    created_by: Uuid::nil(),
                })
                .collect(),
            funds_received: funds
                .into_iter()
                .map(|amount| FundsReceivedRecord {
                    id: Uuid::new_v4(),
                    site_id,
                    amount,
                    received_date: day(),
                    method: String::new(),
                    reference: String::new(),
                    remarks: String::new(),
                    created_at: Utc::now(),
                    created_by: Uuid::nil(),
                })
                .collect(),
            invoices: invoices
                .into_iter()
                .map(|(net_amount, by_supervisor)| InvoiceRecord {
                    id: Uuid::new_v4(),
                    site_id,
                    vendor_name: "Shree Traders".to_string(),
                    invoice_number: "INV-1".to_string(),
                    invoice_date: day(),
                    net_amount,
                    payment_by: if by_supervisor {
                        PaymentBy::Supervisor
                    } else {
                        PaymentBy::HeadOffice
                    },
                    status: InvoiceStatus::Pending,
                    remarks: String::new(),
                    created_at: Utc::now(),
                    created_by: Uuid::nil(),
                })
                .collect(),
        })
}

fn scenario() -> impl Strategy<Value = (Uuid, SiteLedger)> {
    Just(Uuid::new_v4()).prop_flat_map(|id| (Just(id), ledger_strategy(id)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn advances_are_partitioned_between_buckets((site_id, ledger) in scenario()) {
        let summary = compute_site_summary(site_id, &[site(site_id)], &ledger, &DebitPurposes::default());
        let all_advances: Decimal = ledger.advances.iter().map(|a| a.amount).sum();
        prop_assert_eq!(summary.total_advances + summary.debits_to_worker, all_advances);
    }

    #[test]
    fn balance_identity_holds_exactly((site_id, ledger) in scenario()) {
        let summary = compute_site_summary(site_id, &[site(site_id)], &ledger, &DebitPurposes::default());
        prop_assert_eq!(
            summary.total_balance,
            summary.funds_received - summary.total_expenditure - summary.total_advances - summary.invoices_paid
        );
        prop_assert_eq!(summary.pending_invoices, Decimal::ZERO);
    }

    #[test]
    fn head_office_invoices_never_count((site_id, mut ledger) in scenario()) {
        let before = compute_site_summary(site_id, &[site(site_id)], &ledger, &DebitPurposes::default());
        ledger.invoices.retain(|invoice| invoice.payment_by == PaymentBy::Supervisor);
        let after = compute_site_summary(site_id, &[site(site_id)], &ledger, &DebitPurposes::default());
        prop_assert_eq!(before, after);
    }

    #[test]
    fn unknown_site_yields_zeros((site_id, ledger) in scenario()) {
        let other = Uuid::new_v4();
        let summary = compute_site_summary(other, &[site(site_id)], &ledger, &DebitPurposes::default());
        prop_assert_eq!(summary, SiteSummary::default());
    }
}
