//! crawline - Unified CLI for web-text corpus pipelines
//!
//! Batches, splits, filters and merges crawled-document streams into
//! compressed, size-bounded shard trees.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "crawline")]
#[command(about = "Unified CLI for web-text corpus pipelines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./crawline.toml or ~/.config/crawline/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Batch warc2text collections into size-bounded TSV shards
    Batch(cmd::batch::BatchArgs),
    /// Split annotated JSONL into per-language shard trees
    Split(cmd::split::SplitArgs),
    /// Annotate stdin JSONL documents with filter verdicts
    Filter(cmd::filter::FilterArgs),
    /// Merge one warc2text batch directory to TSV on stdout
    Merge(cmd::merge::MergeArgs),
    /// Join lockstep text/metadata/lang streams to JSONL on stdout
    MergeMeta(cmd::merge::MergeMetaArgs),
    /// Convert TSV to JSONL
    Convert(cmd::convert::ConvertArgs),
    /// Count records and filter verdicts across finalized shards
    Stats(cmd::stats::StatsArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(crawline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress bars show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    crawline_core::init_logging(quiet, cli.debug, multi);

    // An interrupt drives the aborting path: completed shards are still
    // finalized before the non-zero exit
    crawline_core::install_signal_handlers()?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Batch(args) => cmd::batch::run(args, &config, &progress),
        Command::Split(args) => cmd::split::run(args, &config, &progress),
        Command::Filter(args) => cmd::filter::run(args, &config),
        Command::Merge(args) => cmd::merge::run(args),
        Command::MergeMeta(args) => cmd::merge::run_meta(args),
        Command::Convert(args) => cmd::convert::run(args),
        Command::Stats(args) => cmd::stats::run(args),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Compression level",
                &config.output.compression_level.to_string(),
            ]);
            table.add_row(vec![
                "Compression threads",
                &config.output.threads.to_string(),
            ]);
            table.add_row(vec!["Batch size", &config.batch.size.to_string()]);
            table.add_row(vec!["Split size", &config.split.size.to_string()]);
            table.add_row(vec![
                "Split threshold",
                &config.split.threshold.to_string(),
            ]);
            table.add_row(vec![
                "Language mapping",
                &config
                    .split
                    .mapping
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not set".to_string()),
            ]);
            table.add_row(vec![
                "Blocklist",
                &config
                    .filter
                    .blocklist
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not set".to_string()),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
