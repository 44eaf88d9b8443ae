//! Merge one warc2text batch directory into a TSV stream
//!
//! Decompression runs through external `zcat` subprocesses so the CPU cost
//! lands outside the process. Both children are always waited on with a
//! bounded timeout and their stderr is surfaced on any failure.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crawline_core::{
    DecodeError, DecompressProcess, Lockstep, PipelineError, WAIT_TIMEOUT,
    decode_base64_segments, decode_utf8, ensure_exists, sanitize_segment,
};

const READ_BUF_SIZE: usize = 256 * 1024;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub docs: u64,
    pub lines: u64,
    pub skipped: u64,
}

/// Emit `url \t segment \t collection` lines for one batch directory.
///
/// The collection name is the grandparent directory component, matching the
/// warc2text layout `{collection}/{dirnum}/{lang}/text.gz`.
pub fn run(input_dir: &Path, out: &mut impl Write) -> Result<MergeSummary, PipelineError> {
    let collection = collection_name(input_dir);
    let text_path = input_dir.join("text.gz");
    let url_path = input_dir.join("url.gz");
    ensure_exists(&text_path)?;
    ensure_exists(&url_path)?;
    log::info!("Reading {}", input_dir.display());

    let mut text_proc = DecompressProcess::spawn("zcat", &text_path)?;
    let mut url_proc = DecompressProcess::spawn("zcat", &url_path)?;

    let rows = Lockstep::new(vec![
        (
            "text.gz".to_string(),
            Box::new(BufReader::with_capacity(READ_BUF_SIZE, text_proc.stdout()))
                as Box<dyn BufRead + Send>,
        ),
        (
            "url.gz".to_string(),
            Box::new(BufReader::with_capacity(READ_BUF_SIZE, url_proc.stdout())),
        ),
    ]);

    let summary = drain(rows, &collection, out)?;

    // the children must have terminated now that their stdouts are drained
    text_proc.finish(WAIT_TIMEOUT)?;
    url_proc.finish(WAIT_TIMEOUT)?;
    Ok(summary)
}

fn drain(
    mut rows: Lockstep,
    collection: &str,
    out: &mut impl Write,
) -> Result<MergeSummary, PipelineError> {
    let mut summary = MergeSummary::default();
    while let Some(row) = rows.next() {
        let row = row?;
        summary.docs += 1;

        let (url, segments) = match decode_row(&row, rows.line()) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("skipping record: {e}");
                summary.skipped += 1;
                continue;
            }
        };

        for segment in &segments {
            let segment = sanitize_segment(segment);
            writeln!(out, "{}\t{}\t{}", url.trim(), segment, collection)?;
            summary.lines += 1;
        }
    }
    Ok(summary)
}

fn decode_row(row: &[Vec<u8>], line: usize) -> Result<(String, Vec<String>), DecodeError> {
    let url = decode_utf8(&row[1], line)?;
    let segments = decode_base64_segments(&row[0], line)?;
    Ok((url, segments))
}

fn collection_name(input_dir: &Path) -> String {
    let mut components = input_dir.components().rev();
    components.next(); // lang
    components.next(); // dirnum
    components
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default()
}
