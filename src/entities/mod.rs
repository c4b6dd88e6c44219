pub mod advance;
pub mod expense;
pub mod funds_received;
pub mod site;
pub mod site_invoice;
