use std::collections::BTreeMap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::search::filters::FilterKind;
use crate::search::SearchSummary;

const PARAM_WIDTH: usize = 60;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Print an assembled query with its parameters.
pub fn print_summary(summary: &SearchSummary) {
    println!(
        "{} filter{} applied to {}",
        summary.applied.len(),
        plural(summary.applied.len()),
        summary.model.name(),
    );
    if !summary.applied.is_empty() {
        println!("  applied: {}", summary.applied.join(", "));
    }
    if !summary.skipped.is_empty() {
        println!("  skipped: {}", summary.skipped.join(", "));
    }

    println!();
    for line in summary.sql.lines() {
        println!("  {line}");
    }

    if summary.params.is_empty() {
        return;
    }

    println!();
    println!("  {:<6} {}", "PARAM", "VALUE");
    println!("  {}", "-".repeat(PARAM_WIDTH + 7));
    for (i, value) in summary.params.iter().enumerate() {
        println!(
            "  ?{:<5} {}",
            i + 1,
            truncate(&value.to_string(), PARAM_WIDTH)
        );
    }
}

/// Print the searchable fields of a model.
pub fn print_fields(model: &str, fields: &BTreeMap<String, FilterKind>) {
    if fields.is_empty() {
        println!("No searchable fields configured for {model}");
        return;
    }

    println!("Searchable fields for {model}:\n");
    println!("  {:<20} {:<18} {}", "FIELD", "FILTER", "VALUE");
    println!("  {}", "-".repeat(46));
    for (name, kind) in fields {
        let shape = if kind.takes_list() { "list" } else { "single" };
        println!("  {:<20} {:<18} {}", truncate(name, 20), kind.name(), shape);
    }
}
