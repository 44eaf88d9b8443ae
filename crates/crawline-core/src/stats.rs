//! Run summary reporting: log lines and tables

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::pipeline::RunSummary;

/// Thousands-separated number formatting for report output.
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl RunSummary {
    /// Minimal summary for non-TTY logs.
    pub fn log(&self) {
        log::info!(
            "Records: {} routed / {} seen ({} skipped, {} dropped)",
            fmt_num(self.counters.routed),
            fmt_num(self.counters.seen),
            fmt_num(self.counters.skipped()),
            fmt_num(self.counters.dropped),
        );
        log::info!(
            "Shards: {} across {} partitions ({} uncompressed bytes)",
            fmt_num(self.pool.shards as u64),
            fmt_num(self.pool.partitions as u64),
            fmt_num(self.pool.bytes),
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.counters.routed > 0 && self.elapsed.as_secs_f64() > 0.0 {
            let rate = self.counters.routed as f64 / self.elapsed.as_secs_f64();
            log::info!("Throughput: {rate:.0} records/sec");
        }
    }

    /// Full table for interactive runs.
    pub fn format_table(&self) -> String {
        let c = &self.counters;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Run summary")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
                Cell::new("%").fg(Color::Cyan),
            ]);

        table.add_row(vec![
            Cell::new("Records seen"),
            Cell::new(fmt_num(c.seen)),
            Cell::new(""),
        ]);
        table.add_row(vec![
            Cell::new("Routed").fg(Color::Green),
            Cell::new(fmt_num(c.routed)).fg(Color::Green),
            Cell::new(format!("{:.1}", pct(c.routed, c.seen))).fg(Color::Green),
        ]);
        if c.unknown > 0 {
            table.add_row(vec![
                Cell::new("  to unk bucket"),
                Cell::new(fmt_num(c.unknown)),
                Cell::new(format!("{:.1}", pct(c.unknown, c.seen))),
            ]);
            table.add_row(vec![
                Cell::new("    below threshold"),
                Cell::new(fmt_num(c.unknown_below_threshold)),
                Cell::new(""),
            ]);
            table.add_row(vec![
                Cell::new("    unmapped tag"),
                Cell::new(fmt_num(c.unknown_unmapped)),
                Cell::new(""),
            ]);
            table.add_row(vec![
                Cell::new("    no tag found"),
                Cell::new(fmt_num(c.unknown_no_match)),
                Cell::new(""),
            ]);
        }
        table.add_row(vec![
            Cell::new("Skipped"),
            Cell::new(fmt_num(c.skipped())),
            Cell::new(format!("{:.3}", pct(c.skipped(), c.seen))),
        ]);
        table.add_row(vec![
            Cell::new("Dropped"),
            Cell::new(fmt_num(c.dropped)),
            Cell::new(format!("{:.3}", pct(c.dropped, c.seen))),
        ]);
        table.add_row(vec![
            Cell::new("Shards finalized"),
            Cell::new(fmt_num(self.pool.shards as u64)),
            Cell::new(""),
        ]);
        table.add_row(vec![
            Cell::new("Partitions"),
            Cell::new(fmt_num(self.pool.partitions as u64)),
            Cell::new(""),
        ]);

        format!("\n{table}")
    }
}
