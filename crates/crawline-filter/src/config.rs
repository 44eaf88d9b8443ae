//! Filter pipeline configuration

use std::path::PathBuf;

/// Which filters run, validated once at startup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Flag explicit content using the adult-domain blocklist
    pub explicit: bool,
    /// Extend the blocklist with banned URL substring patterns
    pub extended_explicit: bool,
    /// Flag docs below the minimum word average per segment
    pub avg_words: bool,
    /// Flag docs below the minimum document size
    pub minimum: bool,
    /// Flag docs below the minimum correct-language segment ratio
    pub language: bool,
    /// Count characters instead of space-separated words (CJK text)
    pub cjk: bool,
    /// Flag exact duplicates (first occurrence kept)
    pub dedup: bool,
    /// Report verdict statistics instead of only annotating
    pub stats: bool,
    /// Path to the adult-domain blocklist (one domain per line)
    pub blocklist: Option<PathBuf>,
}

impl Config {
    /// Enable every filter (`-a/--all`).
    pub fn all(mut self) -> Self {
        self.explicit = true;
        self.avg_words = true;
        self.minimum = true;
        self.language = true;
        self
    }

    /// A blocklist path is required iff the explicit filter runs.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.explicit && self.blocklist.is_none() {
            anyhow::bail!("the explicit filter requires a blocklist path");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_enables_every_filter() {
        let config = Config::default().all();
        assert!(config.explicit && config.avg_words && config.minimum && config.language);
        assert!(!config.cjk);
    }

    #[test]
    fn explicit_without_blocklist_is_invalid() {
        let config = Config {
            explicit: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
