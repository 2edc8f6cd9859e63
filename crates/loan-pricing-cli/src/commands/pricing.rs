use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use loan_pricing_core::pricing::{
    self, Eligibility, LoanEdit, LoanRecord, Patronage,
};

use crate::input;

/// Loan fields settable from the command line. Unset flags keep defaults.
#[derive(Args, Debug, Default)]
#[command(allow_hyphen_values = true)]
pub struct LoanFlags {
    /// Loan type label
    #[arg(long)]
    pub loan_type: Option<String>,

    /// PD/LGD label
    #[arg(long)]
    pub pd_lgd: Option<String>,

    /// Borrower name
    #[arg(long)]
    pub company_name: Option<String>,

    /// Eligibility (directly-eligible, similar-entity)
    #[arg(long)]
    pub eligibility: Option<Eligibility>,

    /// Patronage designation (patronage, non-patronage)
    #[arg(long)]
    pub patronage: Option<Patronage>,

    /// Loan is a revolver
    #[arg(long)]
    pub revolver: bool,

    /// Direct note patronage (%)
    #[arg(long)]
    pub direct_note_patronage: Option<Decimal>,

    /// Fee in lieu (%)
    #[arg(long)]
    pub fee_in_lieu: Option<Decimal>,

    /// Base spread (%)
    #[arg(long)]
    pub spread: Option<Decimal>,

    /// Credit spread adjustment (%)
    #[arg(long)]
    pub csa: Option<Decimal>,

    /// SOFR (%)
    #[arg(long)]
    pub sofr: Option<Decimal>,

    /// Cost of funds (%)
    #[arg(long, alias = "cof")]
    pub cofs: Option<Decimal>,

    /// Upfront fee (%)
    #[arg(long)]
    pub upfront_fee: Option<Decimal>,

    /// Servicing fee (%)
    #[arg(long)]
    pub servicing_fee: Option<Decimal>,

    /// Years to maturity (0-30)
    #[arg(long, alias = "years")]
    pub years_to_maturity: Option<Decimal>,

    /// Unused fee (%), revolvers only
    #[arg(long)]
    pub unused_fee: Option<Decimal>,
}

impl LoanFlags {
    /// Default loan with every given flag applied as a validated edit.
    pub fn to_record(&self) -> Result<LoanRecord, Box<dyn std::error::Error>> {
        let mut record = LoanRecord::default();
        for edit in self.edits() {
            record.apply(edit)?;
        }
        Ok(record)
    }

    fn edits(&self) -> Vec<LoanEdit> {
        let mut edits = Vec::new();
        let text = [
            (&self.loan_type, LoanEdit::LoanType as fn(String) -> LoanEdit),
            (&self.pd_lgd, LoanEdit::PdLgd),
            (&self.company_name, LoanEdit::CompanyName),
        ];
        for (value, make) in text {
            if let Some(v) = value {
                edits.push(make(v.clone()));
            }
        }
        if let Some(v) = self.eligibility {
            edits.push(LoanEdit::Eligibility(v));
        }
        if let Some(v) = self.patronage {
            edits.push(LoanEdit::Patronage(v));
        }
        // Revolver before the unused fee it gates.
        edits.push(LoanEdit::Revolver(self.revolver));

        let numbers = [
            (self.direct_note_patronage, LoanEdit::DirectNotePatronagePct as fn(Decimal) -> LoanEdit),
            (self.fee_in_lieu, LoanEdit::FeeInLieuPct),
            (self.spread, LoanEdit::SpreadPct),
            (self.csa, LoanEdit::CsaPct),
            (self.sofr, LoanEdit::SofrPct),
            (self.cofs, LoanEdit::CofsPct),
            (self.upfront_fee, LoanEdit::UpfrontFeePct),
            (self.servicing_fee, LoanEdit::ServicingFeePct),
            (self.years_to_maturity, LoanEdit::YearsToMaturity),
            (self.unused_fee, LoanEdit::UnusedFeePct),
        ];
        for (value, make) in numbers {
            if let Some(v) = value {
                edits.push(make(v));
            }
        }
        edits
    }
}

/// Arguments shared by commands that take loans
#[derive(Args)]
pub struct LoanInputArgs {
    /// Path to a JSON, YAML or two-column CSV loan file (overrides flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,
}

impl LoanInputArgs {
    pub fn loans(&self) -> Result<Vec<LoanRecord>, Box<dyn std::error::Error>> {
        match input::read_loans(self.input.as_deref())? {
            Some(loans) if loans.is_empty() => Err("input contains no loans".into()),
            Some(loans) => Ok(loans),
            None => Ok(vec![self.loan.to_record()?]),
        }
    }
}

/// Arguments for loan pricing
#[derive(Args)]
pub struct PriceArgs {
    #[command(flatten)]
    pub source: LoanInputArgs,
}

/// Arguments for memo pricing text
#[derive(Args)]
pub struct PricingTextArgs {
    #[command(flatten)]
    pub source: LoanInputArgs,
}

pub fn run_price(args: PriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    price_loans(&args.source.loans()?)
}

fn price_loans(loans: &[LoanRecord]) -> Result<Value, Box<dyn std::error::Error>> {
    let mut results = Vec::with_capacity(loans.len());
    for loan in loans {
        results.push(serde_json::to_value(pricing::price_loan(loan)?)?);
    }
    if results.len() == 1 {
        Ok(results.remove(0))
    } else {
        Ok(json!({ "results": results }))
    }
}

pub fn run_pricing_text(args: PricingTextArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loans = args.source.loans()?;
    let request = loan_pricing_core::integrations::MemoRequest::for_loans(&loans);
    Ok(Value::String(request.pricing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_to_record() {
        let flags = LoanFlags {
            company_name: Some("Red River Sugar".into()),
            patronage: Some(Patronage::Patronage),
            revolver: true,
            spread: Some(dec!(1.00)),
            unused_fee: Some(dec!(0.25)),
            ..Default::default()
        };
        let record = flags.to_record().unwrap();
        assert_eq!(record.company_name, "Red River Sugar");
        assert_eq!(record.unused_fee_pct, dec!(0.25));
        assert_eq!(record.servicing_fee_pct, dec!(0.15));
    }

    #[test]
    fn test_unused_fee_without_revolver_rejected() {
        let flags = LoanFlags {
            unused_fee: Some(dec!(0.25)),
            ..Default::default()
        };
        assert!(flags.to_record().is_err());
    }

    #[test]
    fn test_price_single_loan_envelope() {
        let loan = LoanFlags {
            spread: Some(dec!(1.00)),
            csa: Some(dec!(0.50)),
            sofr: Some(dec!(2.00)),
            cofs: Some(dec!(0.25)),
            upfront_fee: Some(dec!(1.00)),
            ..Default::default()
        }
        .to_record()
        .unwrap();
        let value = price_loans(&[loan]).unwrap();
        let capital: Decimal = value["result"]["computation"]["capital_yield"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(capital, dec!(3.70));
        assert_eq!(value["result"]["summary"][6]["value"], "3.70%");
    }

    #[test]
    fn test_price_many_loans() {
        let value = price_loans(&[LoanRecord::default(), LoanRecord::default()]).unwrap();
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
    }
}
