//! Main runner for the filter pipeline: JSONL in, annotated JSONL out

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use crawline_core::{DomainBlocklist, decode_json};

use crate::config::Config;
use crate::filters::build_chain;

/// Verdict counts for one filter run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub docs: u64,
    pub skipped: u64,
    pub verdicts: BTreeMap<String, u64>,
}

impl FilterSummary {
    /// One line per verdict: `reason \t percentage \t count`.
    pub fn format_stats(&self) -> String {
        let total: u64 = self.verdicts.values().sum();
        let mut out = String::new();
        for (reason, count) in &self.verdicts {
            let pct = if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64 * 100.0
            };
            out.push_str(&format!("{reason}\t{pct:.2}%\t{count}\n"));
        }
        out
    }
}

/// Annotate every document on `input` with a filter verdict.
///
/// Documents that fail to decode are skipped with a warning; everything
/// else is re-emitted with its `filter` field set.
pub fn run(
    config: &Config,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> Result<FilterSummary> {
    config.validate()?;

    let blocklist = match (&config.blocklist, config.explicit) {
        (Some(path), true) => Some(
            DomainBlocklist::from_file(path, config.extended_explicit)
                .with_context(|| format!("loading blocklist {}", path.display()))?,
        ),
        _ => None,
    };
    let mut chain = build_chain(config, blocklist);

    let mut summary = FilterSummary::default();
    let mut buf = Vec::with_capacity(4096);
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        line_no += 1;
        summary.docs += 1;

        let mut record = match decode_json(&buf, line_no) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("skipping record: {e}");
                summary.skipped += 1;
                continue;
            }
        };

        chain.apply(&mut record);
        let reason = record.filter.clone().unwrap_or_else(|| "keep".to_string());
        *summary.verdicts.entry(reason).or_insert(0) += 1;

        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    Ok(summary)
}
