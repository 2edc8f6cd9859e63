use clap::Args;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

use loan_pricing_core::integrations::delivery::suggested_filename_now;
use loan_pricing_core::integrations::{ExportDelivery, LocalDirectoryDelivery};
use loan_pricing_core::pricing::LoanRecord;
use loan_pricing_core::workbook::{export_workbook, import_workbook, sheet_name};

use super::pricing::LoanInputArgs;
use crate::config::CliConfig;
use crate::input;

/// Arguments for workbook export
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: LoanInputArgs,

    /// Directory to write the workbook into (overrides configuration)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for workbook import
#[derive(Args)]
pub struct ImportArgs {
    /// Path to an exported .xlsx workbook
    #[arg(long)]
    pub workbook: String,
}

pub fn run_export(args: ExportArgs, config: &CliConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let loans = args.source.loans()?;
    let dir = args.out_dir.unwrap_or_else(|| config.export_dir.clone());
    export_to(&loans, &LocalDirectoryDelivery::new(dir))
}

fn export_to(
    loans: &[LoanRecord],
    delivery: &dyn ExportDelivery,
) -> Result<Value, Box<dyn std::error::Error>> {
    let bytes = export_workbook(loans)?;
    let filename = suggested_filename_now("xlsx");
    let location = delivery.deliver(&bytes, &filename)?;
    info!(%location, "workbook delivered");

    let sheets: Vec<String> = (0..loans.len()).map(sheet_name).collect();
    Ok(json!({
        "location": location.to_string(),
        "filename": filename,
        "sheets": sheets,
        "bytes": bytes.len(),
    }))
}

pub fn run_import(args: ImportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bytes = input::file::read_bytes(&args.workbook)?;
    let loans = import_workbook(&bytes)?;
    Ok(json!({ "loans": loans }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let loans = vec![
            LoanRecord {
                spread_pct: dec!(1.10),
                ..LoanRecord::default()
            },
            LoanRecord::default(),
        ];
        let value = export_to(&loans, &LocalDirectoryDelivery::new(dir.path())).unwrap();
        assert_eq!(value["sheets"], json!(["Loan 1", "Loan 2"]));
        let filename = value["filename"].as_str().unwrap();
        assert!(filename.starts_with("memo_") && filename.ends_with(".xlsx"));

        let imported = run_import(ImportArgs {
            workbook: value["location"].as_str().unwrap().to_string(),
        })
        .unwrap();
        let back = input::loans_from_value(imported).unwrap();
        assert_eq!(back, loans);
    }
}
