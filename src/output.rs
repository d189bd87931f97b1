//! Rendering of command results on stdout.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::config::OutputFormat;

pub fn render_rows<T>(rows: &[T], format: OutputFormat) -> serde_json::Result<String>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(rows),
        OutputFormat::Table => {
            if rows.is_empty() {
                return Ok("No resources found".to_string());
            }
            Ok(Table::new(rows).with(Style::blank()).to_string())
        }
    }
}

pub fn render_row<T>(row: &T, format: OutputFormat) -> serde_json::Result<String>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(row),
        OutputFormat::Table => Ok(Table::new([row]).with(Style::blank()).to_string()),
    }
}

/// Renders bare values such as zone names or a lifecycle state.
pub fn render_values(key: &str, values: &[String], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => {
            let mut object = serde_json::Map::new();
            object.insert(key.to_string(), serde_json::json!(values));
            serde_json::to_string_pretty(&object)
        }
        OutputFormat::Table => Ok(values.join("\n")),
    }
}
