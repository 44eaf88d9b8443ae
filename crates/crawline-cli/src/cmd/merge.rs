//! Merge subcommands - single-directory TSV and JSONL emission

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// warc2text batch directory where text.gz and url.gz are stored
    pub input_dir: PathBuf,
}

pub fn run(args: MergeArgs) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let summary = crawline_batch::merge::run(&args.input_dir, &mut out)?;
    out.flush()?;

    log::info!(
        "Merged {} documents into {} lines ({} skipped)",
        summary.docs,
        summary.lines,
        summary.skipped
    );
    Ok(())
}

#[derive(Args, Debug)]
pub struct MergeMetaArgs {
    /// Collection name recorded as `crawl_id` on every document
    pub collection: String,

    /// Directory holding text.zst, metadata.zst and lang.zst
    pub input_dir: PathBuf,
}

pub fn run_meta(args: MergeMetaArgs) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let summary = crawline_batch::merge_meta::run(&args.collection, &args.input_dir, &mut out)?;
    out.flush()?;

    log::info!(
        "Merged {} documents: {} written, {} skipped, {} dropped",
        summary.docs,
        summary.written,
        summary.skipped,
        summary.dropped
    );
    Ok(())
}
