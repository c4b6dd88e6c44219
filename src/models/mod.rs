pub mod coerce;
pub mod purpose;
pub mod records;

pub use purpose::AdvancePurpose;
pub use records::{AdvanceRecord, ExpenseRecord, FundsReceivedRecord, InvoiceRecord, SiteRecord};
