//! Batching pipeline configuration

use std::path::PathBuf;

/// Default batch ceiling: 512 MiB of uncompressed payload per shard.
pub const DEFAULT_SIZE: u64 = 512 * 1024 * 1024;

/// Runtime configuration for the batching pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// warc2text directory where collections are stored
    pub directory: PathBuf,
    /// Output directory, shards land under `{output_dir}/{lang}/`
    pub output_dir: PathBuf,
    /// Language to process (names the collection subdirectory and the
    /// output partition)
    pub lang: String,
    /// Byte ceiling per batch (soft, approximated)
    pub size: u64,
    /// Zstd compression level for batch output
    pub zstd_level: i32,
    /// Zstd worker threads
    pub zstd_threads: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            lang: String::new(),
            size: DEFAULT_SIZE,
            zstd_level: 3,
            zstd_threads: 2,
        }
    }
}
