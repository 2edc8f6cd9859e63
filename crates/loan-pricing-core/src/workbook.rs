//! Spreadsheet export and import of loan reports.
//!
//! One worksheet per loan, named `Loan {n}`:
//!
//! ```text
//! row 1            Component | Value          (bold)
//! rows 2..=9       summary view
//! row 10           blank
//! row 11           Field     | Value          (bold)
//! rows 12..=27     detail view
//! ```
//!
//! Numeric detail values are real number cells; everything else is text.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::io::Cursor;
use tracing::{debug, info};

use crate::error::PricingError;
use crate::pricing::{build_detail_view, build_summary_view, compute, CellValue, LoanRecord};
use crate::PricingResult;

pub const SUMMARY_HEADER: [&str; 2] = ["Component", "Value"];
pub const DETAIL_HEADER: [&str; 2] = ["Field", "Value"];
/// Rows between the last summary row and the first detail row.
const DETAIL_OFFSET: u32 = 3;
const SHEET_PREFIX: &str = "Loan ";

pub fn sheet_name(index: usize) -> String {
    format!("{SHEET_PREFIX}{}", index + 1)
}

/// Serialise each loan to its own worksheet and return the xlsx bytes.
pub fn export_workbook(records: &[LoanRecord]) -> PricingResult<Vec<u8>> {
    if records.is_empty() {
        return Err(PricingError::ExportFailure {
            loan_index: None,
            reason: "no loans to export".into(),
        });
    }

    let bold = Format::new().set_bold();
    let number = Format::new().set_num_format("0.00");
    let mut workbook = Workbook::new();

    for (index, record) in records.iter().enumerate() {
        let fail = |reason: String| PricingError::ExportFailure {
            loan_index: Some(index),
            reason,
        };
        let computation = compute(record).map_err(|e| fail(e.to_string()))?;
        let summary = build_summary_view(record, &computation);
        let detail = build_detail_view(record);

        let sheet = workbook.add_worksheet();
        sheet
            .set_name(sheet_name(index))
            .map_err(|e| fail(e.to_string()))?;

        let write = |sheet: &mut rust_xlsxwriter::Worksheet| -> Result<(), XlsxError> {
            sheet.set_column_width(0, 28)?;
            sheet.set_column_width(1, 22)?;

            for (col, title) in SUMMARY_HEADER.iter().enumerate() {
                sheet.write_string_with_format(0, col as u16, *title, &bold)?;
            }
            let mut row: u32 = 1;
            for entry in &summary {
                sheet.write_string(row, 0, entry.label.as_str())?;
                sheet.write_string(row, 1, entry.value.to_string())?;
                row += 1;
            }

            let detail_start = row - 1 + DETAIL_OFFSET;
            for (col, title) in DETAIL_HEADER.iter().enumerate() {
                sheet.write_string_with_format(detail_start - 1, col as u16, *title, &bold)?;
            }
            for (offset, entry) in detail.iter().enumerate() {
                let r = detail_start + offset as u32;
                sheet.write_string(r, 0, entry.label.as_str())?;
                match &entry.value {
                    CellValue::Number(d) => {
                        let v = d.to_f64().unwrap_or_default();
                        sheet.write_number_with_format(r, 1, v, &number)?;
                    }
                    CellValue::Text(s) => {
                        sheet.write_string(r, 1, s.as_str())?;
                    }
                }
            }
            Ok(())
        };
        write(sheet).map_err(|e| fail(e.to_string()))?;
        debug!(sheet = %sheet_name(index), "worksheet written");
    }

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| PricingError::ExportFailure {
            loan_index: None,
            reason: e.to_string(),
        })?;
    info!(loans = records.len(), bytes = bytes.len(), "workbook exported");
    Ok(bytes)
}

/// Rebuild loan records from the detail block of every `Loan {n}` sheet, in
/// sheet-number order. Numbers are taken to two decimal places.
pub fn import_workbook(bytes: &[u8]) -> PricingResult<Vec<LoanRecord>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| PricingError::invalid("workbook", e.to_string()))?;

    let mut sheets: Vec<(usize, String)> = workbook
        .sheet_names()
        .into_iter()
        .filter_map(|name| {
            let n = name.strip_prefix(SHEET_PREFIX)?.trim().parse::<usize>().ok()?;
            Some((n, name))
        })
        .collect();
    sheets.sort_by_key(|(n, _)| *n);

    if sheets.is_empty() {
        return Err(PricingError::invalid("workbook", "no 'Loan N' worksheets found"));
    }

    let mut records = Vec::with_capacity(sheets.len());
    for (_, name) in sheets {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| PricingError::invalid("workbook", format!("{name}: {e}")))?;

        let rows: Vec<(String, String)> = range
            .rows()
            .skip_while(|row| !is_detail_header(row))
            .skip(1)
            .take_while(|row| !matches!(row.first(), None | Some(Data::Empty)))
            .map(|row| {
                let label = cell_text(row.first());
                let value = cell_text(row.get(1));
                (label, value)
            })
            .collect();

        if rows.is_empty() {
            return Err(PricingError::invalid(
                "workbook",
                format!("{name}: detail block not found"),
            ));
        }
        records.push(LoanRecord::from_detail_rows(rows)?);
    }
    Ok(records)
}

fn is_detail_header(row: &[Data]) -> bool {
    matches!(row.first(), Some(Data::String(s)) if s == DETAIL_HEADER[0])
        && matches!(row.get(1), Some(Data::String(s)) if s == DETAIL_HEADER[1])
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) => Decimal::from_f64(*f)
            .map(|d| {
                d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                    .to_string()
            })
            .unwrap_or_else(|| f.to_string()),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Bool(b)) => (if *b { "Yes" } else { "No" }).to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{LoanEdit, Patronage};
    use rust_decimal_macros::dec;

    fn loan(spread: Decimal) -> LoanRecord {
        LoanRecord {
            company_name: "Harvest Ridge".into(),
            spread_pct: spread,
            ..LoanRecord::default()
        }
    }

    fn cells(bytes: &[u8], sheet: &str) -> calamine::Range<Data> {
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec())).unwrap();
        wb.worksheet_range(sheet).unwrap()
    }

    #[test]
    fn test_sheet_per_loan() {
        let bytes = export_workbook(&[loan(dec!(1)), loan(dec!(2)), loan(dec!(3))]).unwrap();
        let wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Loan 1", "Loan 2", "Loan 3"]);
    }

    #[test]
    fn test_layout() {
        let bytes = export_workbook(&[loan(dec!(1.25))]).unwrap();
        let range = cells(&bytes, "Loan 1");

        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Component".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("Assoc Spread".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("1.25%".into())));
        assert_eq!(range.get_value((8, 0)), Some(&Data::String("Capital Yield".into())));
        // Summary ends on row 9; detail header row 11, detail rows from 12 (1-based).
        assert_eq!(range.get_value((10, 0)), Some(&Data::String("Field".into())));
        assert_eq!(range.get_value((11, 0)), Some(&Data::String("Loan Type".into())));
        assert_eq!(range.get_value((26, 0)), Some(&Data::String("Unused Fee (%)".into())));
        assert_eq!(range.get_value((19, 1)), Some(&Data::Float(1.25)));
    }

    fn archive_part(bytes: &[u8], name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        let start = tag.find(&format!(" {name}=\""))? + name.len() + 3;
        let len = tag[start..].find('"')?;
        Some(&tag[start..start + len])
    }

    /// Style index of a cell, if it carries one.
    fn cell_style<'a>(sheet_xml: &'a str, cell: &str) -> Option<&'a str> {
        let open = sheet_xml.find(&format!("<c r=\"{cell}\""))?;
        let end = sheet_xml[open..].find('>')?;
        attr(&sheet_xml[open..open + end], "s")
    }

    fn style_is_bold(styles_xml: &str, style: &str) -> bool {
        let xfs_start = styles_xml.find("<cellXfs").unwrap();
        let xfs_end = styles_xml.find("</cellXfs>").unwrap();
        let xf = styles_xml[xfs_start..xfs_end]
            .split("<xf ")
            .nth(style.parse::<usize>().unwrap() + 1)
            .unwrap();
        let font_id: usize = attr(&format!(" {xf}"), "fontId").unwrap().parse().unwrap();

        let fonts_start = styles_xml.find("<fonts").unwrap();
        let fonts_end = styles_xml.find("</fonts>").unwrap();
        styles_xml[fonts_start..fonts_end]
            .split("</font>")
            .nth(font_id)
            .map(|font| font.contains("<b/>"))
            .unwrap_or(false)
    }

    #[test]
    fn test_header_rows_bold() {
        let bytes = export_workbook(&[loan(dec!(1.25))]).unwrap();
        let sheet = archive_part(&bytes, "xl/worksheets/sheet1.xml");
        let styles = archive_part(&bytes, "xl/styles.xml");

        for cell in ["A1", "B1", "A11", "B11"] {
            let style = cell_style(&sheet, cell).unwrap_or_else(|| panic!("{cell} has no style"));
            assert!(style_is_bold(&styles, style), "{cell} is not bold");
        }
        for cell in ["A2", "B2", "A12", "B20"] {
            let bold = cell_style(&sheet, cell)
                .map(|style| style_is_bold(&styles, style))
                .unwrap_or(false);
            assert!(!bold, "{cell} should not be bold");
        }
    }

    #[test]
    fn test_round_trip() {
        let mut revolver = loan(dec!(2.10));
        revolver.apply(LoanEdit::Revolver(true)).unwrap();
        revolver.apply(LoanEdit::UnusedFeePct(dec!(0.375))).unwrap();
        revolver.apply(LoanEdit::Patronage(Patronage::Patronage)).unwrap();
        revolver.apply(LoanEdit::YearsToMaturity(dec!(7.5))).unwrap();
        let originals = vec![loan(dec!(1.00)), revolver];

        let bytes = export_workbook(&originals).unwrap();
        let back = import_workbook(&bytes).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0], originals[0]);
        assert_eq!(back[1].company_name, "Harvest Ridge");
        assert!(back[1].revolver);
        assert_eq!(back[1].patronage, Patronage::Patronage);
        assert_eq!(back[1].years_to_maturity, dec!(7.5));
        // 0.375 survives to two decimals only.
        assert_eq!(back[1].unused_fee_pct, dec!(0.38));
    }

    #[test]
    fn test_empty_export_rejected() {
        assert!(matches!(
            export_workbook(&[]),
            Err(PricingError::ExportFailure { loan_index: None, .. })
        ));
    }

    #[test]
    fn test_invalid_loan_reports_index() {
        let mut bad = loan(dec!(1));
        bad.years_to_maturity = Decimal::ZERO;
        match export_workbook(&[loan(dec!(1)), bad]).unwrap_err() {
            PricingError::ExportFailure { loan_index, .. } => assert_eq!(loan_index, Some(1)),
            other => panic!("Expected ExportFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_import_garbage() {
        assert!(import_workbook(b"not a workbook").is_err());
    }
}
