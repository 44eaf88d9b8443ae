//! Main runner for the language splitting pipeline

use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use crawline_core::progress::{ProgressContext, upgrade_to_bar};
use crawline_core::{
    Codec, Driver, LangMapping, PipelineError, RawLines, Router, RunSummary, WriterPool,
    ensure_exists, open_reader_counted,
};

use crate::config::Config;

/// Run the splitting pipeline over every input file.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunSummary> {
    // every input must exist before any output is produced
    for input in &config.inputs {
        ensure_exists(input)?;
    }
    std::fs::create_dir_all(&config.output_dir).context("failed to create output directory")?;

    let mapping = LangMapping::from_jsonl(&config.mapping)
        .with_context(|| format!("loading mapping {}", config.mapping.display()))?;
    log::info!("Loaded {} language code mappings", mapping.len());

    let pool = WriterPool::new(
        &config.output_dir,
        Codec::Zstd {
            level: config.zstd_level,
            threads: config.zstd_threads,
        },
        "jsonl",
        config.size,
    );
    let mut driver = Driver::new(pool, Router::by_language(mapping, config.threshold));
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
    for input in &config.inputs {
        log::info!("Splitting {}", input.display());
        drain_file(driver, input, progress)?;
    }
    Ok(())
}

fn drain_file(
    driver: &mut Driver,
    input: &Path,
    progress: &ProgressContext,
) -> Result<(), PipelineError> {
    let (reader, byte_counter, total) = open_reader_counted(input)?;
    let pb = progress.input_bar(
        &input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    upgrade_to_bar(&pb, total);

    let mut lines = RawLines::new(reader);
    let mut since_tick = 0u32;
    while let Some(line) = lines.next() {
        driver.route(&line?)?;
        since_tick += 1;
        if since_tick == 1024 {
            pb.set_position(byte_counter.load(Ordering::Relaxed));
            since_tick = 0;
        }
    }
    pb.finish_and_clear();
    Ok(())
}
