//! Split subcommand - route annotated JSONL into per-language shard trees

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use crawline_core::SharedProgress;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Output directory, shards land under `{output}/{lang}/batch.{n}.jsonl.zst`
    pub output_dir: PathBuf,

    /// Annotated JSONL inputs (commonly `.jsonl.zst`)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Code-translation table (JSONL, classifier code → canonical label)
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Byte ceiling per shard (soft, approximated)
    #[arg(short, long)]
    pub size: Option<u64>,

    /// Confidence threshold below which documents route to `unk`
    #[arg(short, long)]
    pub threshold: Option<f64>,
}

pub fn run(args: SplitArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mapping = args
        .mapping
        .or_else(|| config.split.mapping.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("no language mapping given (--mapping or [split].mapping in config)")
        })?;

    let split_config = crawline_split::Config {
        output_dir: args.output_dir,
        inputs: args.inputs,
        mapping,
        size: args.size.unwrap_or(config.split.size),
        threshold: args.threshold.unwrap_or(config.split.threshold),
        zstd_level: config.split.compression_level,
        zstd_threads: config.output.threads,
    };

    let summary = crawline_split::run(&split_config, progress)?;
    summary.log();
    if progress.is_tty() {
        progress.println(summary.format_table());
    }
    Ok(())
}
