//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{OutputFormat, VecfindArgs};
use crate::dispatch::BatchSummary;
use crate::error::Result;
use crate::protocol::RecordView;

/// Result structure for batch generation.
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    pub path: String,
    pub format: String,
    pub requests: usize,
    pub k: u32,
    pub bytes: u64,
}

/// A parsed vector format and its wire header.
#[derive(Debug, Serialize)]
pub struct FormatResult {
    pub format: String,
    pub record_size: u32,
    pub vector_offset: u32,
    pub element_type: String,
    pub type_code: u8,
    pub vector_length: u32,
    pub vector_bytes: usize,
    pub header: String,
}

/// One decoded request of a request batch file.
#[derive(Debug, Serialize)]
pub struct RequestView {
    pub k: u32,
    pub format: String,
    pub record: RecordView,
}

/// Decoded request batch file.
#[derive(Debug, Serialize)]
pub struct RequestBatchView {
    pub count: usize,
    pub bytes: u64,
    pub requests: Vec<RequestView>,
}

/// Outcome of one object in a simulated round.
#[derive(Debug, Serialize)]
pub struct ObjectReport {
    pub object: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result structure for a simulated round.
#[derive(Debug, Serialize)]
pub struct SimulationResult {
    pub summary: BatchSummary,
    pub request_bytes: usize,
    pub objects: Vec<ObjectReport>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &VecfindArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &VecfindArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;

    match result {
        _ if std::any::type_name::<T>().ends_with("SimulationResult") => {
            output_simulation_human(&value, args)
        }
        _ => {
            print_value(&value, 0);
            Ok(())
        }
    }
}

/// Output a simulated round in human format.
fn output_simulation_human(value: &serde_json::Value, args: &VecfindArgs) -> Result<()> {
    if let Some(summary) = value.get("summary").and_then(|s| s.as_object()) {
        println!("Dispatch Summary:");
        println!("═════════════════");
        for key in [
            "objects",
            "succeeded",
            "empty",
            "failed",
            "malformed",
            "not_submitted",
            "results",
        ] {
            if let Some(count) = summary.get(key).and_then(|c| c.as_u64()) {
                println!("{key}: {count}");
            }
        }
        if let Some(bytes) = value.get("request_bytes").and_then(|b| b.as_u64()) {
            println!("request size: {}", format_bytes(bytes));
        }
        if let Some(elapsed) = summary.get("elapsed_ms").and_then(|e| e.as_u64()) {
            println!("elapsed: {elapsed}ms");
        }
    }

    if args.verbosity() > 1
        && let Some(objects) = value.get("objects").and_then(|o| o.as_array())
    {
        println!();
        println!("Objects:");
        println!("────────");
        for object in objects {
            let name = object.get("object").and_then(|n| n.as_str()).unwrap_or("?");
            let outcome = object.get("outcome").and_then(|o| o.as_str()).unwrap_or("?");
            match (
                object.get("return_code").and_then(|c| c.as_i64()),
                object.get("error").and_then(|e| e.as_str()),
            ) {
                (_, Some(error)) => println!("{name}: {outcome} ({error})"),
                (Some(code), None) => println!("{name}: {outcome} ({code})"),
                (None, None) => println!("{name}: {outcome}"),
            }
        }
    }
    Ok(())
}

/// Print a JSON value as indented `key: value` lines.
fn print_value(value: &serde_json::Value, indent: usize) {
    let spaces = "  ".repeat(indent);

    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                if is_nested(val) {
                    println!("{spaces}{key}:");
                    print_value(val, indent + 1);
                } else {
                    let formatted_val = format_value(val);
                    println!("{spaces}{key}: {formatted_val}");
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr {
                if is_nested(item) {
                    println!("{spaces}-");
                    print_value(item, indent + 1);
                } else {
                    let formatted_item = format_value(item);
                    println!("{spaces}- {formatted_item}");
                }
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{spaces}{formatted_value}");
        }
    }
}

/// Objects and arrays of objects get their own lines.
fn is_nested(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(_) => true,
        serde_json::Value::Array(arr) => arr.iter().any(|v| v.is_object() || v.is_array()),
        _ => false,
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &VecfindArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}

/// Format bytes into human-readable format.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}

/// Lowercase hex, bytes separated by spaces.
pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(40), "40 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes(&[]), "");
        assert_eq!(hex_bytes(&[0x14, 0, 0xff]), "14 00 ff");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("f32")), "f32");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!([1, 2, 3])), "[1, 2, 3]");
        assert_eq!(format_value(&json!(null)), "null");
    }

    #[test]
    fn test_is_nested() {
        assert!(is_nested(&json!({"a": 1})));
        assert!(is_nested(&json!([{"a": 1}])));
        assert!(!is_nested(&json!([0.5, 0.25])));
        assert!(!is_nested(&json!("x")));
    }
}
