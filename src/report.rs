//! Terminal rendering of the ranked H-statistic table.

use owo_colors::OwoColorize;

use crate::interaction::HStatTable;
use crate::types::PairStatistic;

/// Width of the strength bar drawn next to each pair.
const BAR_WIDTH: usize = 40;

/// Render the table sorted by H-statistic, strongest first.
pub fn format_table(rows: &[&PairStatistic]) -> String {
    let w1 = rows.iter().map(|r| r.f1.len()).max().unwrap_or(2).max(2);
    let w2 = rows.iter().map(|r| r.f2.len()).max().unwrap_or(2).max(2);
    let max_hs = rows
        .iter()
        .map(|r| r.hs)
        .filter(|h| h.is_finite())
        .fold(0.0_f64, f64::max);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!(
        "{:>w1$}  {:>w2$}  {:>16}  {:>20}",
        "f1",
        "f2",
        "hs",
        "hs_sqrt",
        w1 = w1,
        w2 = w2
    ));

    for row in rows {
        let bar_len = if max_hs > 0.0 {
            ((row.hs / max_hs) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        lines.push(format!(
            "{:>w1$}  {:>w2$}  {:>16.10}  {:>20.10}  {}",
            row.f1,
            row.f2,
            row.hs,
            row.hs_sqrt,
            "█".repeat(bar_len.min(BAR_WIDTH)),
            w1 = w1,
            w2 = w2
        ));
    }

    lines.join("\n")
}

/// Print the ranked table for one task.
pub fn print_table(table: &HStatTable, sample: &str, query: &str) {
    let title = format!(" H-statistic: {} / {:?} ", sample, query);
    println!();
    println!("{}", title.bold().on_blue());
    println!("{}", format_table(&table.ranked()));
    for (f1, f2) in table.degenerate_names() {
        println!("{}", format!("  ({}, {}): undefined, flat diagonal", f1, f2).dimmed());
    }
}
