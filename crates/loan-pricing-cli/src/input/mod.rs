pub mod file;
pub mod stdin;

use serde_json::Value;

use loan_pricing_core::pricing::LoanRecord;

/// Read loans from `--input` (JSON, YAML or two-column CSV) or piped stdin.
/// Returns `None` when neither is available.
pub fn read_loans(path: Option<&str>) -> Result<Option<Vec<LoanRecord>>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        if file::is_csv(path) {
            return Ok(Some(vec![file::read_detail_csv(path)?]));
        }
        let value: Value = file::read_structured(path)?;
        return Ok(Some(loans_from_value(value)?));
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(loans_from_value(value)?)),
        None => Ok(None),
    }
}

/// Loan inputs as written by hand: one record, a list, or `{"loans": [...]}`.
pub fn loans_from_value(value: Value) -> Result<Vec<LoanRecord>, Box<dyn std::error::Error>> {
    match value {
        Value::Object(mut map) if map.contains_key("loans") => {
            if map.len() > 1 {
                let extra: Vec<&str> = map
                    .keys()
                    .map(String::as_str)
                    .filter(|k| *k != "loans")
                    .collect();
                return Err(format!("unexpected keys next to `loans`: {}", extra.join(", ")).into());
            }
            let loans = map.remove("loans").unwrap_or_default();
            Ok(serde_json::from_value(loans)?)
        }
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}
