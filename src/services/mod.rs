pub mod advances;
pub mod balance;
pub mod expenses;
pub mod funds;
pub mod invoices;
pub mod sites;
