//! Output formatting for CLI commands.

use colored::Colorize;
use rig_hardware::{Resource, Resources};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", format_json(data)),
    }
}

/// Print a single item as JSON.
pub fn print_single<T: Serialize>(data: &T) {
    println!("{}", format_json(data));
}

pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

fn format_json<T: Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_string())
}

/// One resource of a [`Resources`] vector, for table output.
#[derive(Debug, Serialize, Tabled)]
pub struct ResourceRow {
    #[tabled(rename = "Resource")]
    pub resource: &'static str,

    #[tabled(rename = "Value")]
    pub value: String,
}

/// Rows in cpu, ram, gpu, disk, network order.
pub fn resource_rows(resources: &Resources, fmt: impl Fn(f64) -> String) -> Vec<ResourceRow> {
    Resource::ALL
        .iter()
        .map(|&r| ResourceRow {
            resource: r.as_str(),
            value: fmt(resources.get(r)),
        })
        .collect()
}

/// Utilization as a percentage.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn amount(value: f64) -> String {
    format!("{value:.2}")
}
