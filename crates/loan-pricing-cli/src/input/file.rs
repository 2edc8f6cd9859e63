use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use loan_pricing_core::pricing::LoanRecord;

/// Read a JSON or YAML file (by extension) and deserialise into a typed struct.
pub fn read_structured<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

/// Read a file as raw bytes, e.g. an exported workbook.
pub fn read_bytes(path: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let bytes = fs::read(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    Ok(bytes)
}

/// Read a text file, e.g. an extracted transcript.
pub fn read_text(path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let text = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    Ok(text)
}

/// Read one loan from a two-column `label,value` CSV, the layout of a
/// workbook detail block saved as CSV. A leading header row is skipped.
pub fn read_detail_csv(path: &str) -> Result<LoanRecord, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let mut rows: Vec<(String, String)> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let label = record.get(0).unwrap_or_default().to_string();
        let value = record.get(1).unwrap_or_default().to_string();
        rows.push((label, value));
    }
    Ok(LoanRecord::from_detail_rows(rows)?)
}

pub fn is_csv(path: &str) -> bool {
    has_extension(Path::new(path), &["csv"])
}

fn is_yaml(path: &Path) -> bool {
    has_extension(path, &["yaml", "yml"])
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_yaml_and_json_loans() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("loan.yaml");
        fs::write(&yaml, "spread_pct: '1.25'\npatronage: Patronage\n").unwrap();
        let loan: LoanRecord = read_structured(yaml.to_str().unwrap()).unwrap();
        assert_eq!(loan.spread_pct, dec!(1.25));

        let json = dir.path().join("loan.json");
        fs::write(&json, r#"{"sofr_pct": "4.3"}"#).unwrap();
        let loan: LoanRecord = read_structured(json.to_str().unwrap()).unwrap();
        assert_eq!(loan.sofr_pct, dec!(4.3));
    }

    #[test]
    fn test_detail_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pricing.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "Field,Value").unwrap();
        for (label, value) in [
            ("Loan Type", "Revolving Line"),
            ("PD/LGD", "5/C"),
            ("Company Name", "\"Bluestem Farms, Inc.\""),
            ("Eligibility", "Directly Eligible"),
            ("Patronage", "Non-Patronage"),
            ("Revolver", "Yes"),
            ("Direct Note Patronage (%)", "0.40"),
            ("Fee in lieu (%)", "0.00"),
            ("SPREAD (%)", "2.00"),
            ("CSA (%)", "0.10"),
            ("SOFR (%)", "4.30"),
            ("COFs (%)", "4.10"),
            ("Upfront Fee (%)", "0.25"),
            ("Servicing Fee (%)", "0.15"),
            ("Years to Maturity", "3"),
            ("Unused Fee (%)", "0.20"),
        ] {
            writeln!(f, "{label},{value}").unwrap();
        }
        drop(f);

        let loan = read_detail_csv(path.to_str().unwrap()).unwrap();
        assert_eq!(loan.company_name, "Bluestem Farms, Inc.");
        assert!(loan.revolver);
        assert_eq!(loan.unused_fee_pct, dec!(0.20));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_bytes("/definitely/not/here.xlsx").is_err());
    }
}
