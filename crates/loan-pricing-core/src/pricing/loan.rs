//! Loan record data model and field-level edits.
//!
//! A [`LoanRecord`] holds the raw pricing inputs for one loan. Every input is
//! addressable through [`LoanField`], which fixes the order used by the
//! detail view and the spreadsheet layout, and every mutation goes through a
//! [`LoanEdit`] so the record invariants are checked in one place.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PricingError;
use crate::types::{Pct, Years};
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_LOAN_TYPE: &str = "Insert Loan Type";
pub const DEFAULT_PD_LGD: &str = "Insert PD/LGD";
pub const DEFAULT_COMPANY_NAME: &str = "Insert Company Name";
pub const DEFAULT_DIRECT_NOTE_PATRONAGE: Pct = dec!(0.40);
pub const DEFAULT_SERVICING_FEE: Pct = dec!(0.15);
pub const DEFAULT_YEARS_TO_MATURITY: Years = dec!(5.0);
/// Upper bound accepted for `years_to_maturity` edits.
pub const MAX_YEARS_TO_MATURITY: Years = dec!(30);

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Lending eligibility of the borrower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    #[default]
    #[serde(alias = "Directly Eligible")]
    DirectlyEligible,
    #[serde(alias = "Similar Entity")]
    SimilarEntity,
}

impl Eligibility {
    pub fn label(self) -> &'static str {
        match self {
            Eligibility::DirectlyEligible => "Directly Eligible",
            Eligibility::SimilarEntity => "Similar Entity",
        }
    }
}

impl FromStr for Eligibility {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise_token(s).as_str() {
            "directlyeligible" => Ok(Eligibility::DirectlyEligible),
            "similarentity" => Ok(Eligibility::SimilarEntity),
            _ => Err(PricingError::invalid(
                LoanField::Eligibility.key(),
                format!("'{s}' is not one of: Directly Eligible, Similar Entity"),
            )),
        }
    }
}

/// Cooperative patronage designation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patronage {
    #[serde(alias = "Patronage")]
    Patronage,
    #[default]
    #[serde(alias = "Non-Patronage")]
    NonPatronage,
}

impl Patronage {
    pub fn label(self) -> &'static str {
        match self {
            Patronage::Patronage => "Patronage",
            Patronage::NonPatronage => "Non-Patronage",
        }
    }
}

impl FromStr for Patronage {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise_token(s).as_str() {
            "patronage" => Ok(Patronage::Patronage),
            "nonpatronage" => Ok(Patronage::NonPatronage),
            _ => Err(PricingError::invalid(
                LoanField::Patronage.key(),
                format!("'{s}' is not one of: Patronage, Non-Patronage"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// LoanRecord
// ---------------------------------------------------------------------------

/// Raw pricing inputs for one loan. Percentages are percentage points.
///
/// Deserialisation fills absent fields with their defaults, so a JSON or
/// YAML document only needs the fields that differ. Unknown keys are
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoanRecord {
    pub loan_type: String,
    /// Free-text probability-of-default / loss-given-default label.
    pub pd_lgd: String,
    pub company_name: String,
    pub eligibility: Eligibility,
    pub patronage: Patronage,
    pub revolver: bool,
    pub direct_note_patronage_pct: Pct,
    pub fee_in_lieu_pct: Pct,
    pub spread_pct: Pct,
    /// Credit-spread adjustment.
    pub csa_pct: Pct,
    pub sofr_pct: Pct,
    /// Cost of funds.
    pub cofs_pct: Pct,
    pub upfront_fee_pct: Pct,
    pub servicing_fee_pct: Pct,
    pub years_to_maturity: Years,
    /// Undrawn-balance fee; always zero unless `revolver` is set.
    pub unused_fee_pct: Pct,
}

impl Default for LoanRecord {
    fn default() -> Self {
        LoanRecord {
            loan_type: DEFAULT_LOAN_TYPE.to_string(),
            pd_lgd: DEFAULT_PD_LGD.to_string(),
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            eligibility: Eligibility::default(),
            patronage: Patronage::default(),
            revolver: false,
            direct_note_patronage_pct: DEFAULT_DIRECT_NOTE_PATRONAGE,
            fee_in_lieu_pct: Decimal::ZERO,
            spread_pct: Decimal::ZERO,
            csa_pct: Decimal::ZERO,
            sofr_pct: Decimal::ZERO,
            cofs_pct: Decimal::ZERO,
            upfront_fee_pct: Decimal::ZERO,
            servicing_fee_pct: DEFAULT_SERVICING_FEE,
            years_to_maturity: DEFAULT_YEARS_TO_MATURITY,
            unused_fee_pct: Decimal::ZERO,
        }
    }
}

impl LoanRecord {
    /// Apply a single field edit, enforcing the record invariants.
    ///
    /// Turning `revolver` off zeroes the unused fee. Setting a non-zero unused
    /// fee on a non-revolver, or a maturity outside `[0, 30]`, is rejected and
    /// leaves the record untouched.
    pub fn apply(&mut self, edit: LoanEdit) -> PricingResult<()> {
        match edit {
            LoanEdit::LoanType(v) => self.loan_type = v,
            LoanEdit::PdLgd(v) => self.pd_lgd = v,
            LoanEdit::CompanyName(v) => self.company_name = v,
            LoanEdit::Eligibility(v) => self.eligibility = v,
            LoanEdit::Patronage(v) => self.patronage = v,
            LoanEdit::Revolver(v) => {
                self.revolver = v;
                if !v {
                    self.unused_fee_pct = Decimal::ZERO;
                }
            }
            LoanEdit::DirectNotePatronagePct(v) => self.direct_note_patronage_pct = v,
            LoanEdit::FeeInLieuPct(v) => self.fee_in_lieu_pct = v,
            LoanEdit::SpreadPct(v) => self.spread_pct = v,
            LoanEdit::CsaPct(v) => self.csa_pct = v,
            LoanEdit::SofrPct(v) => self.sofr_pct = v,
            LoanEdit::CofsPct(v) => self.cofs_pct = v,
            LoanEdit::UpfrontFeePct(v) => self.upfront_fee_pct = v,
            LoanEdit::ServicingFeePct(v) => self.servicing_fee_pct = v,
            LoanEdit::YearsToMaturity(v) => {
                if v < Decimal::ZERO || v > MAX_YEARS_TO_MATURITY {
                    return Err(PricingError::invalid(
                        LoanField::YearsToMaturity.key(),
                        format!("{v} is outside the accepted range [0, {MAX_YEARS_TO_MATURITY}]"),
                    ));
                }
                self.years_to_maturity = v;
            }
            LoanEdit::UnusedFeePct(v) => {
                if !self.revolver && !v.is_zero() {
                    return Err(PricingError::invalid(
                        LoanField::UnusedFeePct.key(),
                        "Unused fee only applies to revolving loans.",
                    ));
                }
                self.unused_fee_pct = v;
            }
        }
        Ok(())
    }

    /// Rebuild a record from `(label, raw value)` pairs, e.g. the detail block
    /// of an exported workbook or a two-column CSV.
    ///
    /// Rows may arrive in any order and unknown labels are ignored, but every
    /// [`LoanField`] must be present. Edits are applied in [`LoanField::ALL`]
    /// order so `Revolver` is settled before `Unused Fee (%)`.
    pub fn from_detail_rows<I, L, V>(rows: I) -> PricingResult<LoanRecord>
    where
        I: IntoIterator<Item = (L, V)>,
        L: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw: [Option<String>; LoanField::COUNT] = Default::default();
        for (label, value) in rows {
            if let Some(field) = LoanField::parse(label.as_ref()) {
                raw[field.position()] = Some(value.as_ref().to_string());
            }
        }

        let mut record = LoanRecord::default();
        for field in LoanField::ALL {
            let value = raw[field.position()].as_deref().ok_or_else(|| {
                PricingError::invalid(field.key(), format!("'{}' row is missing", field.label()))
            })?;
            record.apply(LoanEdit::parse(field, value)?)?;
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Fields and edits
// ---------------------------------------------------------------------------

/// Addressable input fields, in detail-view order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanField {
    LoanType,
    PdLgd,
    CompanyName,
    Eligibility,
    Patronage,
    Revolver,
    DirectNotePatronagePct,
    FeeInLieuPct,
    SpreadPct,
    CsaPct,
    SofrPct,
    CofsPct,
    UpfrontFeePct,
    ServicingFeePct,
    YearsToMaturity,
    UnusedFeePct,
}

impl LoanField {
    pub const COUNT: usize = 16;

    pub const ALL: [LoanField; LoanField::COUNT] = [
        LoanField::LoanType,
        LoanField::PdLgd,
        LoanField::CompanyName,
        LoanField::Eligibility,
        LoanField::Patronage,
        LoanField::Revolver,
        LoanField::DirectNotePatronagePct,
        LoanField::FeeInLieuPct,
        LoanField::SpreadPct,
        LoanField::CsaPct,
        LoanField::SofrPct,
        LoanField::CofsPct,
        LoanField::UpfrontFeePct,
        LoanField::ServicingFeePct,
        LoanField::YearsToMaturity,
        LoanField::UnusedFeePct,
    ];

    /// Display label used by the detail view and the workbook.
    pub fn label(self) -> &'static str {
        match self {
            LoanField::LoanType => "Loan Type",
            LoanField::PdLgd => "PD/LGD",
            LoanField::CompanyName => "Company Name",
            LoanField::Eligibility => "Eligibility",
            LoanField::Patronage => "Patronage",
            LoanField::Revolver => "Revolver",
            LoanField::DirectNotePatronagePct => "Direct Note Patronage (%)",
            LoanField::FeeInLieuPct => "Fee in lieu (%)",
            LoanField::SpreadPct => "SPREAD (%)",
            LoanField::CsaPct => "CSA (%)",
            LoanField::SofrPct => "SOFR (%)",
            LoanField::CofsPct => "COFs (%)",
            LoanField::UpfrontFeePct => "Upfront Fee (%)",
            LoanField::ServicingFeePct => "Servicing Fee (%)",
            LoanField::YearsToMaturity => "Years to Maturity",
            LoanField::UnusedFeePct => "Unused Fee (%)",
        }
    }

    /// Machine key, identical to the `LoanRecord` field name.
    pub fn key(self) -> &'static str {
        match self {
            LoanField::LoanType => "loan_type",
            LoanField::PdLgd => "pd_lgd",
            LoanField::CompanyName => "company_name",
            LoanField::Eligibility => "eligibility",
            LoanField::Patronage => "patronage",
            LoanField::Revolver => "revolver",
            LoanField::DirectNotePatronagePct => "direct_note_patronage_pct",
            LoanField::FeeInLieuPct => "fee_in_lieu_pct",
            LoanField::SpreadPct => "spread_pct",
            LoanField::CsaPct => "csa_pct",
            LoanField::SofrPct => "sofr_pct",
            LoanField::CofsPct => "cofs_pct",
            LoanField::UpfrontFeePct => "upfront_fee_pct",
            LoanField::ServicingFeePct => "servicing_fee_pct",
            LoanField::YearsToMaturity => "years_to_maturity",
            LoanField::UnusedFeePct => "unused_fee_pct",
        }
    }

    /// True for fields holding a decimal value.
    pub fn is_numeric(self) -> bool {
        self.position() >= LoanField::DirectNotePatronagePct.position()
    }

    /// Resolve either a display label or a machine key.
    pub fn parse(s: &str) -> Option<LoanField> {
        let s = s.trim();
        LoanField::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(s) || f.key().eq_ignore_ascii_case(s))
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LoanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single-field mutation of a [`LoanRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum LoanEdit {
    LoanType(String),
    PdLgd(String),
    CompanyName(String),
    Eligibility(Eligibility),
    Patronage(Patronage),
    Revolver(bool),
    DirectNotePatronagePct(Pct),
    FeeInLieuPct(Pct),
    SpreadPct(Pct),
    CsaPct(Pct),
    SofrPct(Pct),
    CofsPct(Pct),
    UpfrontFeePct(Pct),
    ServicingFeePct(Pct),
    YearsToMaturity(Years),
    UnusedFeePct(Pct),
}

impl LoanEdit {
    /// Build an edit for `field` from user-entered text.
    ///
    /// Numbers accept a trailing `%`; booleans accept yes/no/true/false.
    pub fn parse(field: LoanField, raw: &str) -> PricingResult<LoanEdit> {
        let edit = match field {
            LoanField::LoanType => LoanEdit::LoanType(raw.to_string()),
            LoanField::PdLgd => LoanEdit::PdLgd(raw.to_string()),
            LoanField::CompanyName => LoanEdit::CompanyName(raw.to_string()),
            LoanField::Eligibility => LoanEdit::Eligibility(raw.parse()?),
            LoanField::Patronage => LoanEdit::Patronage(raw.parse()?),
            LoanField::Revolver => LoanEdit::Revolver(parse_flag(field, raw)?),
            LoanField::DirectNotePatronagePct => {
                LoanEdit::DirectNotePatronagePct(parse_number(field, raw)?)
            }
            LoanField::FeeInLieuPct => LoanEdit::FeeInLieuPct(parse_number(field, raw)?),
            LoanField::SpreadPct => LoanEdit::SpreadPct(parse_number(field, raw)?),
            LoanField::CsaPct => LoanEdit::CsaPct(parse_number(field, raw)?),
            LoanField::SofrPct => LoanEdit::SofrPct(parse_number(field, raw)?),
            LoanField::CofsPct => LoanEdit::CofsPct(parse_number(field, raw)?),
            LoanField::UpfrontFeePct => LoanEdit::UpfrontFeePct(parse_number(field, raw)?),
            LoanField::ServicingFeePct => LoanEdit::ServicingFeePct(parse_number(field, raw)?),
            LoanField::YearsToMaturity => LoanEdit::YearsToMaturity(parse_number(field, raw)?),
            LoanField::UnusedFeePct => LoanEdit::UnusedFeePct(parse_number(field, raw)?),
        };
        Ok(edit)
    }

    /// The field this edit targets.
    pub fn field(&self) -> LoanField {
        match self {
            LoanEdit::LoanType(_) => LoanField::LoanType,
            LoanEdit::PdLgd(_) => LoanField::PdLgd,
            LoanEdit::CompanyName(_) => LoanField::CompanyName,
            LoanEdit::Eligibility(_) => LoanField::Eligibility,
            LoanEdit::Patronage(_) => LoanField::Patronage,
            LoanEdit::Revolver(_) => LoanField::Revolver,
            LoanEdit::DirectNotePatronagePct(_) => LoanField::DirectNotePatronagePct,
            LoanEdit::FeeInLieuPct(_) => LoanField::FeeInLieuPct,
            LoanEdit::SpreadPct(_) => LoanField::SpreadPct,
            LoanEdit::CsaPct(_) => LoanField::CsaPct,
            LoanEdit::SofrPct(_) => LoanField::SofrPct,
            LoanEdit::CofsPct(_) => LoanField::CofsPct,
            LoanEdit::UpfrontFeePct(_) => LoanField::UpfrontFeePct,
            LoanEdit::ServicingFeePct(_) => LoanField::ServicingFeePct,
            LoanEdit::YearsToMaturity(_) => LoanField::YearsToMaturity,
            LoanEdit::UnusedFeePct(_) => LoanField::UnusedFeePct,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_number(field: LoanField, raw: &str) -> PricingResult<Decimal> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return Err(PricingError::invalid(field.key(), "A numeric value is required."));
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| PricingError::invalid(field.key(), format!("'{raw}' is not a number")))
}

fn parse_flag(field: LoanField, raw: &str) -> PricingResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(true),
        "no" | "n" | "false" => Ok(false),
        _ => Err(PricingError::invalid(field.key(), format!("'{raw}' is not Yes or No"))),
    }
}

fn normalise_token(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
