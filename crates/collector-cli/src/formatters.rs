//! Output formatters for CLI commands.
//!
//! Every command result is `Serialize`; the formatter turns it into JSON,
//! flat `key=value` text, or an indented colored tree.

use anyhow::Result;
use colored::Colorize;
use collector_core::cli::OutputFormat;
use serde::Serialize;
use serde_json::Value;

/// Formats data according to the specified output format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Examples
///
/// ```
/// use collector_cli::formatters::format_output;
/// use collector_core::cli::OutputFormat;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Report {
///     exit_code: i32,
///     settled: usize,
/// }
///
/// let report = Report { exit_code: 0, settled: 1 };
/// let output = format_output(&report, OutputFormat::Text)?;
/// assert_eq!(output, "exit_code=0\nsettled=1");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Formats data as JSON with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Plain `key=value` lines for scripts.
pub mod text {
    use super::{Result, Serialize, Value};

    /// Flattens data into one `path=value` line per leaf.
    ///
    /// Nested keys are joined with `.`, array indices are written as
    /// `[i]`. Strings are written without quotes.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut lines = Vec::new();
        flatten(&value, "", &mut lines);
        Ok(lines.join("\n"))
    }

    fn flatten(value: &Value, path: &str, lines: &mut Vec<String>) {
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    flatten(child, &child_path, lines);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (i, child) in items.iter().enumerate() {
                    flatten(child, &format!("{path}[{i}]"), lines);
                }
            }
            Value::String(s) if path.is_empty() => lines.push(s.clone()),
            Value::String(s) => lines.push(format!("{path}={s}")),
            other if path.is_empty() => lines.push(other.to_string()),
            other => lines.push(format!("{path}={other}")),
        }
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize, Value};

    /// Formats data as a colorized, indented tree.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = String::new();
        write_value(&value, 0, &mut out);
        Ok(out.trim_end().to_string())
    }

    fn scalar(value: &Value) -> String {
        match value {
            Value::Null => "null".dimmed().to_string(),
            Value::Bool(b) => b.to_string().yellow().to_string(),
            Value::Number(n) => n.to_string().cyan().to_string(),
            Value::String(s) => s.green().to_string(),
            Value::Array(a) if a.is_empty() => "[]".dimmed().to_string(),
            Value::Object(o) if o.is_empty() => "{}".dimmed().to_string(),
            Value::Array(_) | Value::Object(_) => String::new(),
        }
    }

    fn is_nested(value: &Value) -> bool {
        match value {
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            _ => false,
        }
    }

    fn write_value(value: &Value, indent: usize, out: &mut String) {
        let pad = "  ".repeat(indent);
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    if is_nested(child) {
                        out.push_str(&format!("{pad}{}:\n", key.blue().bold()));
                        write_value(child, indent + 1, out);
                    } else {
                        out.push_str(&format!("{pad}{}: {}\n", key.blue().bold(), scalar(child)));
                    }
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for child in items {
                    if is_nested(child) {
                        out.push_str(&format!("{pad}-\n"));
                        write_value(child, indent + 1, out);
                    } else {
                        out.push_str(&format!("{pad}- {}\n", scalar(child)));
                    }
                }
            }
            other => {
                out.push_str(&format!("{pad}{}\n", scalar(other)));
            }
        }
    }
}
