//! Spread and yield arithmetic for a single loan.
//!
//! ```text
//! association_spread = spread + csa + sofr - cofs
//! income_yield       = association_spread + direct_note_patronage
//!                      + upfront_fee / years_to_maturity - servicing_fee
//! capital_yield      = income_yield - patronage_deduction
//! ```
//!
//! Everything is kept at full `Decimal` precision; rounding belongs to the
//! report views.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::loan::{LoanRecord, Patronage, MAX_YEARS_TO_MATURITY};
use super::report::{build_detail_view, build_summary_view, ReportRow};
use crate::error::PricingError;
use crate::types::{with_metadata, ComputationOutput, Pct};
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Capital-yield deduction applied to patronage loans.
pub const PATRONAGE_DEDUCTION: Pct = dec!(0.71);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Derived figures for one loan. Recomputed on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanComputation {
    pub association_spread: Pct,
    pub patronage_deduction: Pct,
    /// Upfront fee spread evenly over the years to maturity.
    pub amortized_upfront_fee: Pct,
    pub income_yield: Pct,
    pub capital_yield: Pct,
}

/// Computation plus both report views, as shown to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPricingReport {
    pub computation: LoanComputation,
    pub summary: Vec<ReportRow>,
    pub detail: Vec<ReportRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check that a record can be priced. Runs before any arithmetic.
pub fn validate_record(record: &LoanRecord) -> PricingResult<()> {
    if record.years_to_maturity <= Decimal::ZERO {
        return Err(PricingError::invalid(
            "years_to_maturity",
            "Years to maturity must be positive to amortise the upfront fee.",
        ));
    }
    if record.years_to_maturity > MAX_YEARS_TO_MATURITY {
        return Err(PricingError::invalid(
            "years_to_maturity",
            format!(
                "{} is outside the accepted range [0, {MAX_YEARS_TO_MATURITY}]",
                record.years_to_maturity
            ),
        ));
    }
    if !record.revolver && !record.unused_fee_pct.is_zero() {
        return Err(PricingError::invalid(
            "unused_fee_pct",
            "Unused fee must be 0.00 when the loan is not a revolver.",
        ));
    }
    Ok(())
}

/// Compute spread and yields for one loan.
pub fn compute(record: &LoanRecord) -> PricingResult<LoanComputation> {
    validate_record(record)?;

    let association_spread = record
        .spread_pct
        .checked_add(record.csa_pct)
        .and_then(|v| v.checked_add(record.sofr_pct))
        .and_then(|v| v.checked_sub(record.cofs_pct))
        .ok_or_else(|| out_of_range("spread_pct", "association spread"))?;

    let patronage_deduction = match record.patronage {
        Patronage::Patronage => PATRONAGE_DEDUCTION,
        Patronage::NonPatronage => Decimal::ZERO,
    };

    if record.years_to_maturity.is_zero() {
        return Err(PricingError::DivisionByZero {
            context: "upfront fee amortisation".into(),
        });
    }
    let amortized_upfront_fee = record
        .upfront_fee_pct
        .checked_div(record.years_to_maturity)
        .ok_or_else(|| out_of_range("years_to_maturity", "amortized upfront fee"))?;

    let income_yield = association_spread
        .checked_add(record.direct_note_patronage_pct)
        .and_then(|v| v.checked_add(amortized_upfront_fee))
        .and_then(|v| v.checked_sub(record.servicing_fee_pct))
        .ok_or_else(|| out_of_range("direct_note_patronage_pct", "income yield"))?;
    let capital_yield = income_yield
        .checked_sub(patronage_deduction)
        .ok_or_else(|| out_of_range("direct_note_patronage_pct", "capital yield"))?;

    debug!(
        company = %record.company_name,
        %association_spread,
        %income_yield,
        %capital_yield,
        "loan priced"
    );

    Ok(LoanComputation {
        association_spread,
        patronage_deduction,
        amortized_upfront_fee,
        income_yield,
        capital_yield,
    })
}

/// Price a loan and assemble both report views inside the standard envelope.
pub fn price_loan(record: &LoanRecord) -> PricingResult<ComputationOutput<LoanPricingReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let computation = compute(record)?;

    if computation.capital_yield < Decimal::ZERO {
        warnings.push(format!(
            "Capital yield is negative ({}%); check cost of funds and fees.",
            computation.capital_yield.round_dp(2)
        ));
    }
    if record.revolver && record.unused_fee_pct.is_zero() {
        warnings.push("Revolver has no unused fee.".into());
    }
    for placeholder in placeholder_fields(record) {
        warnings.push(format!("{placeholder} still holds its placeholder text."));
    }

    let output = LoanPricingReport {
        computation,
        summary: build_summary_view(record, &computation),
        detail: build_detail_view(record),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "patronage_deduction": PATRONAGE_DEDUCTION.to_string(),
        "upfront_fee_amortisation": "straight-line over years to maturity",
        "units": "percentage points",
    });

    Ok(with_metadata(
        "Association spread / income & capital yield build-up",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn out_of_range(field: &str, quantity: &str) -> PricingError {
    PricingError::invalid(
        field,
        format!("Inputs are too large to compute the {quantity} at decimal precision."),
    )
}

fn placeholder_fields(record: &LoanRecord) -> Vec<&'static str> {
    use super::loan::{DEFAULT_COMPANY_NAME, DEFAULT_LOAN_TYPE, DEFAULT_PD_LGD};

    let mut out = Vec::new();
    if record.loan_type == DEFAULT_LOAN_TYPE {
        out.push("Loan Type");
    }
    if record.pd_lgd == DEFAULT_PD_LGD {
        out.push("PD/LGD");
    }
    if record.company_name == DEFAULT_COMPANY_NAME {
        out.push("Company Name");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::loan::LoanEdit;

    fn scenario_a() -> LoanRecord {
        LoanRecord {
            spread_pct: dec!(1.00),
            csa_pct: dec!(0.50),
            sofr_pct: dec!(2.00),
            cofs_pct: dec!(0.25),
            direct_note_patronage_pct: dec!(0.40),
            upfront_fee_pct: dec!(1.00),
            years_to_maturity: dec!(5.0),
            servicing_fee_pct: dec!(0.15),
            patronage: Patronage::NonPatronage,
            ..LoanRecord::default()
        }
    }

    #[test]
    fn test_association_spread() {
        let c = compute(&scenario_a()).unwrap();
        assert_eq!(c.association_spread, dec!(3.25));
    }

    #[test]
    fn test_non_patronage_yields() {
        let c = compute(&scenario_a()).unwrap();
        // 3.25 + 0.40 + 1.00/5 - 0.15
        assert_eq!(c.amortized_upfront_fee, dec!(0.20));
        assert_eq!(c.income_yield, dec!(3.70));
        assert_eq!(c.patronage_deduction, Decimal::ZERO);
        assert_eq!(c.capital_yield, dec!(3.70));
    }

    #[test]
    fn test_patronage_deduction() {
        let mut loan = scenario_a();
        loan.patronage = Patronage::Patronage;
        let c = compute(&loan).unwrap();
        assert_eq!(c.patronage_deduction, dec!(0.71));
        assert_eq!(c.capital_yield, dec!(2.99));
    }

    #[test]
    fn test_full_precision_retained() {
        let mut loan = scenario_a();
        loan.years_to_maturity = dec!(3);
        let c = compute(&loan).unwrap();
        assert_eq!(c.amortized_upfront_fee, dec!(1.00) / dec!(3));
        assert_ne!(c.amortized_upfront_fee, dec!(0.33));
    }

    #[test]
    fn test_zero_maturity_rejected() {
        let mut loan = scenario_a();
        loan.years_to_maturity = Decimal::ZERO;
        match compute(&loan).unwrap_err() {
            PricingError::InvalidInput { field, .. } => assert_eq!(field, "years_to_maturity"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_maturity_above_cap_rejected() {
        let mut loan = scenario_a();
        loan.years_to_maturity = dec!(30);
        assert!(compute(&loan).is_ok());
        loan.years_to_maturity = dec!(30.01);
        match compute(&loan).unwrap_err() {
            PricingError::InvalidInput { field, .. } => assert_eq!(field, "years_to_maturity"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_inputs_are_errors() {
        let mut loan = scenario_a();
        loan.spread_pct = Decimal::MAX;
        loan.csa_pct = dec!(1);
        match compute(&loan).unwrap_err() {
            PricingError::InvalidInput { field, .. } => assert_eq!(field, "spread_pct"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }

        let mut loan = scenario_a();
        loan.cofs_pct = Decimal::MIN;
        assert!(matches!(compute(&loan), Err(PricingError::InvalidInput { .. })));

        let mut loan = scenario_a();
        loan.spread_pct = Decimal::MAX - dec!(5);
        loan.csa_pct = Decimal::ZERO;
        loan.sofr_pct = Decimal::ZERO;
        loan.cofs_pct = Decimal::ZERO;
        loan.direct_note_patronage_pct = dec!(10);
        match compute(&loan).unwrap_err() {
            PricingError::InvalidInput { field, .. } => {
                assert_eq!(field, "direct_note_patronage_pct")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_tiny_maturity_is_invalid_input() {
        let mut loan = scenario_a();
        loan.upfront_fee_pct = Decimal::MAX;
        loan.years_to_maturity = Decimal::new(1, 28);
        match compute(&loan).unwrap_err() {
            PricingError::InvalidInput { field, reason } => {
                assert_eq!(field, "years_to_maturity");
                assert!(reason.contains("amortized upfront fee"), "{reason}");
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_unused_fee_rejected() {
        let mut loan = scenario_a();
        loan.unused_fee_pct = dec!(0.25);
        assert!(matches!(
            compute(&loan),
            Err(PricingError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_fee_in_lieu_does_not_move_yield() {
        let mut loan = scenario_a();
        loan.apply(LoanEdit::FeeInLieuPct(dec!(0.30))).unwrap();
        assert_eq!(compute(&loan).unwrap().income_yield, dec!(3.70));
    }

    #[test]
    fn test_price_loan_envelope() {
        let result = price_loan(&scenario_a()).unwrap();
        assert_eq!(result.result.summary.len(), 8);
        assert_eq!(result.result.detail.len(), 16);
        assert_eq!(result.metadata.precision, "rust_decimal_128bit");
        assert!(!result.methodology.is_empty());
        // Default text fields are still placeholders.
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_negative_capital_yield_warns() {
        let loan = LoanRecord {
            loan_type: "Term".into(),
            pd_lgd: "5/C".into(),
            company_name: "Acme".into(),
            cofs_pct: dec!(1.00),
            patronage: Patronage::Patronage,
            ..LoanRecord::default()
        };
        let result = price_loan(&loan).unwrap();
        assert!(result.result.computation.capital_yield < Decimal::ZERO);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("negative"));
    }
}
