//! Stats subcommand - count records and filter verdicts across shards

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use rayon::prelude::*;
use regex::bytes::Regex;

use crawline_core::RawLines;
use crawline_core::stats::fmt_num;

/// Verdict extraction without parsing the record, over raw shard lines.
static FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""filter": ?"([^"]+)""#).expect("static pattern"));

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Shard tree root: one subdirectory per partition
    pub shard_dir: PathBuf,
}

#[derive(Debug, Default, Clone)]
struct PartitionStats {
    records: u64,
    verdicts: BTreeMap<String, u64>,
}

impl PartitionStats {
    fn merge(&mut self, other: PartitionStats) {
        self.records += other.records;
        for (reason, count) in other.verdicts {
            *self.verdicts.entry(reason).or_insert(0) += count;
        }
    }
}

pub fn run(args: StatsArgs) -> Result<()> {
    let mut partitions = Vec::new();
    for entry in std::fs::read_dir(&args.shard_dir)
        .with_context(|| format!("reading {}", args.shard_dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            partitions.push(path);
        }
    }
    partitions.sort_unstable();

    // one task per finalized shard file, aggregated per partition
    let mut work = Vec::new();
    for (idx, partition) in partitions.iter().enumerate() {
        for shard in shard_files(partition)? {
            work.push((idx, shard));
        }
    }
    let counted: Vec<(usize, PartitionStats)> = work
        .par_iter()
        .map(|(idx, shard)| Ok((*idx, count_shard(shard)?)))
        .collect::<Result<_>>()?;

    let mut stats = vec![PartitionStats::default(); partitions.len()];
    for (idx, shard_stats) in counted {
        stats[idx].merge(shard_stats);
    }

    print_table(&partitions, &stats);
    Ok(())
}

/// Finalized shard files in one partition directory; `.tmp` leftovers from
/// crashed runs are incomplete and not counted.
fn shard_files(partition: &Path) -> Result<Vec<PathBuf>> {
    let pattern = partition.join("batch.*");
    let mut files = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry?;
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("ignoring incomplete shard {}", path.display());
            continue;
        }
        files.push(path);
    }
    files.sort_unstable();
    Ok(files)
}

fn count_shard(path: &Path) -> Result<PartitionStats> {
    let mut stats = PartitionStats::default();
    for line in RawLines::open(path).with_context(|| format!("opening {}", path.display()))? {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        stats.records += 1;
        if let Some(caps) = FILTER_RE.captures(&line) {
            let reason = String::from_utf8_lossy(&caps[1]).into_owned();
            *stats.verdicts.entry(reason).or_insert(0) += 1;
        }
    }
    Ok(stats)
}

fn print_table(partitions: &[PathBuf], stats: &[PartitionStats]) {
    // keep comes first, the remaining reasons in sorted order
    let mut reasons: Vec<String> = stats
        .iter()
        .flat_map(|s| s.verdicts.keys().cloned())
        .filter(|r| r != "keep")
        .collect();
    reasons.sort_unstable();
    reasons.dedup();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    let mut header = vec![
        Cell::new("Partition").fg(Color::Cyan),
        Cell::new("Records").fg(Color::Cyan),
        Cell::new("keep").fg(Color::Green),
    ];
    header.extend(reasons.iter().map(|r| Cell::new(r).fg(Color::Cyan)));
    table.set_header(header);

    for (partition, stat) in partitions.iter().zip(stats) {
        let name = partition
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut row = vec![
            Cell::new(name),
            Cell::new(fmt_num(stat.records)),
            Cell::new(
                stat.verdicts
                    .get("keep")
                    .map(|c| fmt_num(*c))
                    .unwrap_or_default(),
            ),
        ];
        for reason in &reasons {
            row.push(Cell::new(
                stat.verdicts
                    .get(reason)
                    .map(|c| fmt_num(*c))
                    .unwrap_or_default(),
            ));
        }
        table.add_row(row);
    }

    println!("{table}");
}
