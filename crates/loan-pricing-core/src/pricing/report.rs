//! Flattened report views of a priced loan.
//!
//! The summary view lists the pricing build-up; the detail view lists every
//! raw input. Both are ordered `(label, value)` rows shared by the CLI tables,
//! the workbook export and the memo pricing text.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::engine::LoanComputation;
use super::loan::{LoanField, LoanRecord};

/// Summary row labels, in display order.
pub const SUMMARY_LABELS: [&str; 8] = [
    "Assoc Spread",
    "Patronage",
    "Fee in lieu",
    "Servicing Fee",
    "Upfront Fee",
    "Direct Note Patronage",
    "Income Yield",
    "Capital Yield",
];

/// A report cell. Numbers keep full precision and render with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(Decimal),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(d) => f.write_str(&format_two_dp(*d)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub value: CellValue,
}

impl ReportRow {
    fn text(label: &str, value: impl Into<String>) -> Self {
        ReportRow {
            label: label.to_string(),
            value: CellValue::Text(value.into()),
        }
    }
}

/// Pricing build-up for one loan. Deductions are shown with an explicit
/// minus sign, the upfront fee is pro-rated by maturity.
pub fn build_summary_view(record: &LoanRecord, computation: &LoanComputation) -> Vec<ReportRow> {
    let values = [
        format_pct(computation.association_spread),
        format_deduction(computation.patronage_deduction),
        format_pct(record.fee_in_lieu_pct),
        format_deduction(record.servicing_fee_pct),
        format_pct(computation.amortized_upfront_fee),
        format_pct(record.direct_note_patronage_pct),
        format_pct(computation.income_yield),
        format_pct(computation.capital_yield),
    ];
    SUMMARY_LABELS
        .iter()
        .zip(values)
        .map(|(label, value)| ReportRow::text(label, value))
        .collect()
}

/// Every raw input field, in [`LoanField::ALL`] order.
pub fn build_detail_view(record: &LoanRecord) -> Vec<ReportRow> {
    LoanField::ALL
        .into_iter()
        .map(|field| ReportRow {
            label: field.label().to_string(),
            value: field_value(record, field),
        })
        .collect()
}

/// Detail view flattened to `Label: value` lines, the pricing block sent to
/// the memo drafter.
pub fn pricing_text(record: &LoanRecord) -> String {
    build_detail_view(record)
        .iter()
        .map(|row| format!("{}: {}", row.label, row.value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn field_value(record: &LoanRecord, field: LoanField) -> CellValue {
    let yes_no = |b: bool| if b { "Yes" } else { "No" };
    match field {
        LoanField::LoanType => CellValue::Text(record.loan_type.clone()),
        LoanField::PdLgd => CellValue::Text(record.pd_lgd.clone()),
        LoanField::CompanyName => CellValue::Text(record.company_name.clone()),
        LoanField::Eligibility => CellValue::Text(record.eligibility.label().into()),
        LoanField::Patronage => CellValue::Text(record.patronage.label().into()),
        LoanField::Revolver => CellValue::Text(yes_no(record.revolver).into()),
        LoanField::DirectNotePatronagePct => CellValue::Number(record.direct_note_patronage_pct),
        LoanField::FeeInLieuPct => CellValue::Number(record.fee_in_lieu_pct),
        LoanField::SpreadPct => CellValue::Number(record.spread_pct),
        LoanField::CsaPct => CellValue::Number(record.csa_pct),
        LoanField::SofrPct => CellValue::Number(record.sofr_pct),
        LoanField::CofsPct => CellValue::Number(record.cofs_pct),
        LoanField::UpfrontFeePct => CellValue::Number(record.upfront_fee_pct),
        LoanField::ServicingFeePct => CellValue::Number(record.servicing_fee_pct),
        LoanField::YearsToMaturity => CellValue::Number(record.years_to_maturity),
        LoanField::UnusedFeePct => CellValue::Number(record.unused_fee_pct),
    }
}

/// `3.7` -> `"3.70%"`, `-0.751` -> `"-0.75%"`.
pub fn format_pct(value: Decimal) -> String {
    format!("{}%", format_two_dp(value))
}

/// Always signed: `0.71` -> `"-0.71%"`, `0` -> `"-0.00%"`.
pub fn format_deduction(value: Decimal) -> String {
    format!("-{}%", format_two_dp(value.abs()))
}

fn format_two_dp(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.rescale(2);
    rounded.to_string()
}
