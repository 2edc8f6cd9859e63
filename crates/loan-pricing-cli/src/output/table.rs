use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{as_report_row, flatten, format_scalar, is_report};

/// Format output as tables using the tabled crate. Each report section
/// (summary, detail) gets its own two-column table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result, map);
            } else if let Some(Value::Array(results)) = map.get("results") {
                for (i, item) in results.iter().enumerate() {
                    println!("Loan {}", i + 1);
                    print_table(item);
                    println!();
                }
            } else {
                print_sections(map);
            }
        }
        Value::Array(arr) => {
            for item in arr {
                print_table(item);
            }
        }
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_sections(res_map),
        other => println!("{}", format_scalar(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Report row arrays and arrays of objects print as their own tables;
/// everything else is flattened into one Field/Value table.
fn print_sections(map: &Map<String, Value>) {
    let mut scalars = Map::new();
    let mut sections: Vec<(&str, &Vec<Value>)> = Vec::new();
    for (key, val) in map {
        match val {
            Value::Array(arr) if is_report(arr) || arr.iter().any(Value::is_object) => {
                sections.push((key.as_str(), arr))
            }
            other => {
                scalars.insert(key.clone(), other.clone());
            }
        }
    }

    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (field, value) in flatten(&scalars) {
            builder.push_record([field, value]);
        }
        println!("{}", Table::from(builder));
    }

    for (title, arr) in sections {
        println!("\n{}", title);
        if is_report(arr) {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (label, val) in arr.iter().filter_map(as_report_row) {
                builder.push_record([label.to_string(), format_scalar(val)]);
            }
            println!("{}", Table::from(builder));
        } else {
            print_array_table(arr);
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_scalar(item));
        }
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Array(arr) if is_report(arr) => format!("({} rows)", arr.len()),
        other => format_scalar(other),
    }
}
