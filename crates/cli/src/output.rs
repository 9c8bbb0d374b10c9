//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::{Deserialize, Serialize};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn new_table(headers: Vec<&'static str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers);
    table
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn to_yaml<T: Serialize + ?Sized>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

fn plain_rows<T: TableDisplay>(item: &T) -> String {
    T::headers()
        .iter()
        .zip(item.row())
        .map(|(header, value)| format!("{}: {}", header, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a single item
pub fn render_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = new_table(T::headers());
            table.add_row(item.row());
            table.to_string()
        }
        OutputFormat::Json => to_json(item),
        OutputFormat::Yaml => to_yaml(item),
        OutputFormat::Plain => plain_rows(item),
    }
}

/// Render a list of items
pub fn render_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                return "No items found.".to_string();
            }
            let mut table = new_table(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            table.to_string()
        }
        OutputFormat::Json => to_json(items),
        OutputFormat::Yaml => to_yaml(items),
        OutputFormat::Plain => {
            if items.is_empty() {
                return "No items found.".to_string();
            }
            items
                .iter()
                .map(plain_rows)
                .collect::<Vec<_>>()
                .join("\n---\n")
        }
    }
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    println!("{}", render_item(item, format));
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    println!("{}", render_list(items, format));
}

/// Print any serializable value in a structured format; tables fall back to JSON
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Yaml => println!("{}", to_yaml(value)),
        _ => println!("{}", to_json(value)),
    }
}

/// Print a simple message
pub fn print_message(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "message": message }));
        }
        _ => {
            println!("{}", message);
        }
    }
}

/// Print section heading, tables only
pub fn print_heading(title: &str, format: OutputFormat) {
    if is_human(format) {
        println!("{}", title.bold());
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message);
}

/// Whether human-oriented text may share stdout with `format`
pub fn is_human(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Table | OutputFormat::Plain)
}

/// Print success message unless the output is meant for a parser
pub fn print_status(message: &str, format: OutputFormat) {
    if is_human(format) {
        print_success(message);
    }
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{}  {}", "⚠️".yellow(), message);
}

/// Muted text for deactivated rows
pub fn muted(text: &str) -> String {
    text.dimmed().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: String,
        source: String,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Source"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.clone(), self.source.clone()]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "eth0".to_string(),
                source: "default profile".to_string(),
            },
            Row {
                name: "root".to_string(),
                source: "LXD".to_string(),
            },
        ]
    }

    #[test]
    fn test_plain_list() {
        let out = render_list(&rows(), OutputFormat::Plain);
        assert_eq!(
            out,
            "Name: eth0\nSource: default profile\n---\nName: root\nSource: LXD"
        );
    }

    #[test]
    fn test_json_list() {
        let out = render_list(&rows(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[1]["source"], "LXD");
    }

    #[test]
    fn test_empty_table() {
        let out = render_list::<Row>(&[], OutputFormat::Table);
        assert_eq!(out, "No items found.");
        assert_eq!(render_list::<Row>(&[], OutputFormat::Json), "[]");
    }

    #[test]
    fn test_table_contains_cells() {
        let out = render_item(&rows()[0], OutputFormat::Table);
        assert!(out.contains("eth0"));
        assert!(out.contains("default profile"));
    }

    #[test]
    fn test_structured_formats_are_not_human() {
        assert!(is_human(OutputFormat::Table));
        assert!(is_human(OutputFormat::Plain));
        assert!(!is_human(OutputFormat::Json));
        assert!(!is_human(OutputFormat::Yaml));
    }
}
