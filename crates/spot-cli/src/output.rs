//! Output formatting utilities

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Hourly price, or a dash when unknown
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("${:.4}", p),
        None => "-".to_string(),
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Format a 0-1 fraction as a percentage
pub fn format_fraction(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// Color a 0-1 instance score
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.3}", score);
    if score >= 0.70 {
        formatted.green().to_string()
    } else if score >= 0.55 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a 0-100 zone score
pub fn color_zone_score(score: f64) -> String {
    let formatted = format!("{:.1}", score);
    if score >= 80.0 {
        formatted.green().to_string()
    } else if score >= 60.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color zone recommendation confidence
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_fraction(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(0.0416)), "$0.0416");
        assert_eq!(format_price(None), "-");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&ts), "2024-05-01 12:30 UTC");
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(0.55), "55%");
        assert_eq!(format_fraction(1.0), "100%");
    }

    #[test]
    fn test_colored_values_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_score(0.8123), "0.812");
        assert_eq!(color_zone_score(72.24), "72.2");
        assert_eq!(color_confidence(0.3), "30%");
    }
}
