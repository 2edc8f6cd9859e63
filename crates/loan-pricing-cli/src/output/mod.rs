pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match (format, value) {
        (OutputFormat::Json, _) => json::print_json(value),
        // Plain text (pricing text, transcripts) prints as-is.
        (_, Value::String(s)) => println!("{}", s),
        (OutputFormat::Table, _) => table::print_table(value),
        (OutputFormat::Csv, _) => csv_out::print_csv(value),
        (OutputFormat::Minimal, _) => minimal::print_minimal(value),
    }
}

/// A `{"label": .., "value": ..}` report row, as produced by the summary and
/// detail views.
pub(crate) fn as_report_row(value: &Value) -> Option<(&str, &Value)> {
    let map = value.as_object()?;
    if map.len() != 2 {
        return None;
    }
    Some((map.get("label")?.as_str()?, map.get("value")?))
}

pub(crate) fn is_report(arr: &[Value]) -> bool {
    !arr.is_empty() && arr.iter().all(|v| as_report_row(v).is_some())
}

/// Flatten nested objects into dotted `field, value` pairs. Report row
/// arrays contribute one pair per row, keyed by the row label.
pub(crate) fn flatten(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, val) in map {
        flatten_into(key, val, &mut out);
    }
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten_into(&format!("{prefix}.{key}"), val, out);
            }
        }
        Value::Array(arr) if is_report(arr) => {
            for (label, val) in arr.iter().filter_map(as_report_row) {
                out.push((format!("{prefix}.{label}"), format_scalar(val)));
            }
        }
        other => out.push((prefix.to_string(), format_scalar(other))),
    }
}

pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_flatten_report_rows() {
        let value = json!({
            "computation": {"income_yield": "7.66"},
            "summary": [
                {"label": "Assoc Spread", "value": "1.00%"},
                {"label": "Capital Yield", "value": "-2.64%"}
            ],
            "warnings": ["a", "b"]
        });
        let rows = flatten(value.as_object().unwrap());
        assert_eq!(
            rows,
            vec![
                ("computation.income_yield".to_string(), "7.66".to_string()),
                ("summary.Assoc Spread".to_string(), "1.00%".to_string()),
                ("summary.Capital Yield".to_string(), "-2.64%".to_string()),
                ("warnings".to_string(), "a, b".to_string()),
            ]
        );
    }

    #[test]
    fn test_report_detection() {
        assert!(is_report(&[json!({"label": "x", "value": 1})]));
        assert!(!is_report(&[json!({"label": "x"})]));
        assert!(!is_report(&[]));
    }
}
