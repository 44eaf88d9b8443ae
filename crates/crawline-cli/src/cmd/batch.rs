//! Batch subcommand - size-bucketed batching of warc2text collections

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use crawline_core::SharedProgress;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// warc2text directory where collections are stored
    pub directory: PathBuf,

    /// Output directory, shards land under `{output}/{lang}/batch.{n}.tsv.zst`
    pub output_dir: PathBuf,

    /// Language to process
    #[arg(short, long)]
    pub lang: String,

    /// Byte ceiling per batch (soft, approximated)
    #[arg(short, long)]
    pub size: Option<u64>,
}

pub fn run(args: BatchArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let batch_config = crawline_batch::Config {
        directory: args.directory,
        output_dir: args.output_dir,
        lang: args.lang,
        size: args.size.unwrap_or(config.batch.size),
        zstd_level: config.output.compression_level,
        zstd_threads: config.output.threads,
    };

    let summary = crawline_batch::run(&batch_config, progress)?;
    summary.log();
    if progress.is_tty() {
        progress.println(summary.format_table());
    }
    Ok(())
}
