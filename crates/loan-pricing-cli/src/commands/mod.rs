pub mod integrations;
pub mod pricing;
pub mod session;
pub mod workbook;
