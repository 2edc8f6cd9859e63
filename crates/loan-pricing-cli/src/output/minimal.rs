use serde_json::Value;

use super::format_scalar;

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, in the result
/// object and one level below it, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "capital_yield",
        "income_yield",
        "location",
        "state",
        "loans",
    ];

    if let Value::Object(map) = result_obj {
        let nested = map.values().filter_map(Value::as_object);
        for key in &priority_keys {
            let found = std::iter::once(map)
                .chain(nested.clone())
                .find_map(|m| m.get(*key).filter(|v| !v.is_null()));
            if let Some(val) = found {
                println!("{}", format_minimal(val));
                return;
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.len().to_string(),
        Value::Null => "null".to_string(),
        other => format_scalar(other),
    }
}
