//! Convert subcommand - TSV to JSONL

use std::io::Write;

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Column names separated by comma, ordered as they appear in the file
    #[arg(short, long, conflicts_with = "group_docs")]
    pub columns: Option<String>,

    /// Reconstruct documents from consecutive same-URL segment rows
    #[arg(long)]
    pub group_docs: bool,

    /// Document language recorded on grouped documents
    #[arg(short, long, requires = "group_docs")]
    pub lang: Option<String>,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());

    let summary = if args.group_docs {
        let lang = args
            .lang
            .ok_or_else(|| anyhow::anyhow!("--group-docs requires --lang"))?;
        crawline_batch::convert::group_docs(&lang, stdin.lock(), &mut out)?
    } else {
        let columns = args
            .columns
            .ok_or_else(|| anyhow::anyhow!("either --columns or --group-docs is required"))?;
        let names: Vec<String> = columns.split(',').map(str::to_string).collect();
        crawline_batch::convert::columns(&names, stdin.lock(), &mut out)?
    };
    out.flush()?;

    log::info!(
        "Converted {} rows into {} records ({} skipped)",
        summary.rows,
        summary.written,
        summary.skipped
    );
    Ok(())
}
