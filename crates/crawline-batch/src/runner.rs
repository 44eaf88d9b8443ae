//! Main runner for the batching pipeline
//!
//! Gathers collection name, URL and text from warc2text batches and splits
//! the lines into size-bounded compressed batches, one TSV line per
//! paragraph segment: `url \t segment \t collection`.

use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use crawline_core::progress::{ProgressContext, upgrade_to_bar};
use crawline_core::{
    Codec, DecodeError, Driver, Lockstep, PipelineError, Router, RunSummary, WriterPool,
    decode_base64_segments, decode_utf8, ensure_exists, open_reader, open_reader_counted,
    sanitize_segment,
};

use crate::config::Config;

/// Run the batching pipeline over every collection in the input directory.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunSummary> {
    ensure_exists(&config.directory)?;
    std::fs::create_dir_all(&config.output_dir).context("failed to create output directory")?;

    let pool = WriterPool::new(
        &config.output_dir,
        Codec::Zstd {
            level: config.zstd_level,
            threads: config.zstd_threads,
        },
        "tsv",
        config.size,
    );
    let mut driver = Driver::new(pool, Router::fixed(config.lang.as_str()));
    driver.start()?;

    match drain(&mut driver, config, progress) {
        Ok(()) => {
            let summary = driver.finish()?;
            Ok(summary)
        }
        Err(e) => Err(driver.abort(e).into()),
    }
}

fn drain(
    driver: &mut Driver,
    config: &Config,
    progress: &ProgressContext,
) -> Result<(), PipelineError> {
    for coll in sorted_subdirs(&config.directory)? {
        let coll_path = config.directory.join(&coll);
        for dirnum in numbered_subdirs(&coll_path)? {
            let curpath = coll_path.join(dirnum.to_string()).join(&config.lang);
            if !curpath.is_dir() {
                continue;
            }
            log::info!("Reading {coll}/{dirnum}");
            drain_dir(driver, &curpath, &coll, &config.lang, progress)?;
        }
    }
    Ok(())
}

/// Drain one warc2text batch directory: lockstep base64 text + url streams.
fn drain_dir(
    driver: &mut Driver,
    dir: &Path,
    collection: &str,
    lang: &str,
    progress: &ProgressContext,
) -> Result<(), PipelineError> {
    let text_path = dir.join("text.gz");
    let url_path = dir.join("url.gz");
    // both companions must exist before either is read
    ensure_exists(&text_path)?;
    ensure_exists(&url_path)?;

    let (text_reader, byte_counter, total) = open_reader_counted(&text_path)?;
    let url_reader = open_reader(&url_path)?;
    let mut rows = Lockstep::new(vec![
        ("text.gz".to_string(), text_reader),
        ("url.gz".to_string(), url_reader),
    ]);

    let pb = progress.input_bar(&format!("{collection}/{}", dir_label(dir)));
    upgrade_to_bar(&pb, total);

    let mut line_buf = String::new();
    while let Some(row) = rows.next() {
        let row = row?;
        driver.record_seen();
        pb.set_position(byte_counter.load(Ordering::Relaxed));

        let doc = match decode_doc(&row, rows.line()) {
            Ok(doc) => doc,
            Err(e) => {
                driver.skip(&e);
                continue;
            }
        };

        // propagate url and collection onto every segment line
        for segment in &doc.segments {
            let segment = sanitize_segment(segment);
            line_buf.clear();
            line_buf.push_str(&doc.url);
            line_buf.push('\t');
            line_buf.push_str(&segment);
            line_buf.push('\t');
            line_buf.push_str(collection);
            driver.write_keyed(lang, line_buf.as_bytes())?;
        }
    }
    pb.finish_and_clear();
    Ok(())
}

struct Decoded {
    url: String,
    segments: Vec<String>,
}

fn decode_doc(row: &[Vec<u8>], line: usize) -> Result<Decoded, DecodeError> {
    let url = decode_utf8(&row[1], line)?;
    let segments = decode_base64_segments(&row[0], line)?;
    Ok(Decoded {
        url: url.trim().to_string(),
        segments,
    })
}

fn dir_label(dir: &Path) -> String {
    dir.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Collection directories, sorted by name.
fn sorted_subdirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Numbered batch directories, sorted numerically rather than lexically.
fn numbered_subdirs(dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut nums = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_string_lossy().parse::<u64>() {
            Ok(n) => nums.push(n),
            Err(_) => log::warn!(
                "ignoring non-numeric batch directory {}",
                entry.path().display()
            ),
        }
    }
    nums.sort_unstable();
    Ok(nums)
}
