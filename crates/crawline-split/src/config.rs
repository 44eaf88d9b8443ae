//! Language splitting configuration

use std::path::PathBuf;

use crawline_core::DEFAULT_THRESHOLD;

/// Default shard ceiling: 100 GB of uncompressed payload per batch.
pub const DEFAULT_SIZE: u64 = 100_000_000_000;

/// Runtime configuration for the language splitting pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Output directory, shards land under `{output_dir}/{lang}/`
    pub output_dir: PathBuf,
    /// Annotated JSONL inputs (commonly `.jsonl.zst`)
    pub inputs: Vec<PathBuf>,
    /// Code-translation table (JSONL, classifier code → canonical label)
    pub mapping: PathBuf,
    /// Byte ceiling per shard (soft, approximated)
    pub size: u64,
    /// Confidence threshold below which documents route to `unk`
    pub threshold: f64,
    /// Zstd compression level for shard output
    pub zstd_level: i32,
    /// Zstd worker threads
    pub zstd_threads: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            inputs: Vec::new(),
            mapping: PathBuf::new(),
            size: DEFAULT_SIZE,
            threshold: DEFAULT_THRESHOLD,
            zstd_level: 10,
            zstd_threads: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.size, 100_000_000_000);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.zstd_level, 10);
    }
}
