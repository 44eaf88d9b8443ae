//! Filter subcommand - annotate stdin JSONL with filter verdicts

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Use all filters
    #[arg(short, long)]
    pub all: bool,

    /// Flag explicit content with the UT1 adult domain list
    #[arg(short, long)]
    pub explicit: bool,

    /// Extended explicit URL block looking for banned patterns
    #[arg(short = 'E', long)]
    pub extended_explicit: bool,

    /// Flag docs that do not meet the minimum word average per segment
    #[arg(short = 'w', long)]
    pub avg_words: bool,

    /// Flag docs that do not meet the minimum size
    #[arg(short, long)]
    pub minimum: bool,

    /// Flag docs that do not meet the minimum correct language pct
    #[arg(short, long)]
    pub language: bool,

    /// Process CJK language (character counts instead of words)
    #[arg(short = 'z', long)]
    pub cjk: bool,

    /// Flag exact duplicate documents (first occurrence kept)
    #[arg(short, long)]
    pub dedup: bool,

    /// Path to the adult domain blocklist
    #[arg(short = 'r', long)]
    pub robots: Option<PathBuf>,

    /// Print verdict statistics to stderr after the run
    #[arg(long)]
    pub stats: bool,
}

pub fn run(args: FilterArgs, config: &Config) -> Result<()> {
    let mut filter_config = crawline_filter::Config {
        explicit: args.explicit,
        extended_explicit: args.extended_explicit,
        avg_words: args.avg_words,
        minimum: args.minimum,
        language: args.language,
        cjk: args.cjk,
        dedup: args.dedup,
        stats: args.stats,
        blocklist: args.robots.or_else(|| config.filter.blocklist.clone()),
    };
    if args.all {
        filter_config = filter_config.all();
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let summary = crawline_filter::run(&filter_config, stdin.lock(), &mut out)?;
    out.flush()?;

    log::info!(
        "Annotated {} documents ({} skipped)",
        summary.docs,
        summary.skipped
    );
    if filter_config.stats {
        eprint!("{}", summary.format_stats());
    }
    Ok(())
}
