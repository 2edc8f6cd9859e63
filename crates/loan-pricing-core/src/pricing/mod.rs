pub mod engine;
pub mod loan;
pub mod report;

pub use engine::{compute, price_loan, validate_record, LoanComputation, LoanPricingReport};
pub use loan::{Eligibility, LoanEdit, LoanField, LoanRecord, Patronage};
pub use report::{build_detail_view, build_summary_view, pricing_text, CellValue, ReportRow};
