//! Display utilities for the CLI

use colored::*;

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".bright_green(), message);
}

/// A rejection the scenario expects
pub fn rejected(message: &str) {
    println!("  {} {}", "✗".bright_red(), message.bright_red());
}

pub fn info(message: &str) {
    println!("  {} {}", "→".bright_blue(), message);
}

/// Print a key-value pair
pub fn kv(key: &str, value: impl std::fmt::Display) {
    println!("      {}: {}", key, value.to_string().bright_cyan());
}
