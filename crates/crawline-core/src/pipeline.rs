//! Pipeline driver: run state machine and per-record bookkeeping
//!
//! The driver owns the writer pool and the router and enforces the
//! `INIT → RUNNING → (DRAINING | ABORTING) → CLOSED` lifecycle. Variant
//! runners pull records from their sources and push them through here one
//! at a time; no component holds more than one record in memory.

use std::time::{Duration, Instant};

use crate::decode::DecodeError;
use crate::error::PipelineError;
use crate::router::{Route, Router, UnknownReason};
use crate::shutdown::is_shutdown_requested;
use crate::sink::{PoolSummary, WriterPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running,
    Draining,
    Aborting,
    Closed,
}

/// Per-run record counters. Recoverable skips are never silent: every
/// skipped or unknown-routed record lands in exactly one counter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counters {
    pub seen: u64,
    pub routed: u64,
    pub unknown: u64,
    pub unknown_no_match: u64,
    pub unknown_below_threshold: u64,
    pub unknown_unmapped: u64,
    pub skipped_encoding: u64,
    pub skipped_base64: u64,
    pub skipped_json: u64,
    pub dropped: u64,
}

impl Counters {
    /// Count one recoverable decode skip by class.
    pub fn skip(&mut self, err: &DecodeError) {
        debug_assert!(!err.is_fatal());
        match err {
            DecodeError::Encoding { .. } => self.skipped_encoding += 1,
            DecodeError::Base64 { .. } => self.skipped_base64 += 1,
            DecodeError::Json { .. } => self.skipped_json += 1,
            DecodeError::Misalignment { .. } => {}
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_encoding + self.skipped_base64 + self.skipped_json
    }
}

/// Final report of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counters: Counters,
    pub pool: PoolSummary,
    pub elapsed: Duration,
}

/// Streaming sharding engine: source records in, finalized shards out.
pub struct Driver {
    pool: WriterPool,
    router: Router,
    state: RunState,
    counters: Counters,
    started: Instant,
}

impl Driver {
    pub fn new(pool: WriterPool, router: Router) -> Self {
        Self {
            pool,
            router,
            state: RunState::Init,
            counters: Counters::default(),
            started: Instant::now(),
        }
    }

    /// INIT → RUNNING: pre-create partition directories for the declared
    /// key set (purging stale tmp files from crashed runs).
    pub fn start(&mut self) -> Result<(), PipelineError> {
        debug_assert_eq!(self.state, RunState::Init);
        self.pool.declare_keys(self.router.declared_keys())?;
        self.started = Instant::now();
        self.state = RunState::Running;
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Classify one raw record and append it to its shard.
    ///
    /// Returns the chosen route on success. Errors (shard I/O, external
    /// interruption) are fatal; the caller must hand them to [`abort`].
    ///
    /// [`abort`]: Self::abort
    pub fn route(&mut self, raw: &[u8]) -> Result<Route, PipelineError> {
        debug_assert_eq!(self.state, RunState::Running);
        if is_shutdown_requested() {
            return Err(PipelineError::Interrupted);
        }
        self.counters.seen += 1;
        let route = self.router.classify(raw);
        match &route {
            Route::Key(_) => {}
            Route::Unknown(reason) => {
                self.counters.unknown += 1;
                match reason {
                    UnknownReason::NoMatch => self.counters.unknown_no_match += 1,
                    UnknownReason::BelowThreshold => {
                        self.counters.unknown_below_threshold += 1
                    }
                    UnknownReason::Unmapped => self.counters.unknown_unmapped += 1,
                }
            }
        }
        self.pool.write(route.key(), raw)?;
        self.counters.routed += 1;
        Ok(route)
    }

    /// Append a pre-encoded record to an explicit partition, bypassing the
    /// router (used where classification happened upstream).
    pub fn write_keyed(&mut self, key: &str, payload: &[u8]) -> Result<(), PipelineError> {
        debug_assert_eq!(self.state, RunState::Running);
        if is_shutdown_requested() {
            return Err(PipelineError::Interrupted);
        }
        self.pool.write(key, payload)?;
        self.counters.routed += 1;
        Ok(())
    }

    /// Record a document-level arrival that may span several routed lines.
    pub fn record_seen(&mut self) {
        self.counters.seen += 1;
    }

    /// Count one recoverable per-record skip and continue.
    pub fn skip(&mut self, err: &DecodeError) {
        log::warn!("skipping record: {err}");
        self.counters.skip(err);
    }

    /// Count one deliberate drop (e.g. empty document), with its reason
    /// already logged by the caller.
    pub fn drop_record(&mut self) {
        self.counters.dropped += 1;
    }

    /// RUNNING → DRAINING → CLOSED on natural end-of-input.
    pub fn finish(mut self) -> Result<RunSummary, PipelineError> {
        self.state = RunState::Draining;
        let pool = self.pool.close_all();
        self.state = RunState::Closed;
        let pool = pool?;
        Ok(RunSummary {
            counters: self.counters,
            pool,
            elapsed: self.started.elapsed(),
        })
    }

    /// RUNNING → ABORTING → CLOSED on a fatal error.
    ///
    /// Shards that completed before the fault are still finalized and
    /// renamed; the triggering error is handed back for propagation.
    pub fn abort(mut self, err: PipelineError) -> PipelineError {
        self.state = RunState::Aborting;
        log::error!("aborting run: {err}");
        if let Err(close_err) = self.pool.close_all() {
            log::error!("best-effort shard finalization failed: {close_err}");
        }
        self.state = RunState::Closed;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::langmap::LangMapping;
    use crate::router::DEFAULT_THRESHOLD;
    use crate::sink::Codec;
    use crate::source::RawLines;
    use tempfile::TempDir;

    fn mapping() -> LangMapping {
        LangMapping::from_reader(
            r#"{"code": "fin_Latn", "label": "fi", "script": "Latn"}"#.as_bytes(),
        )
        .unwrap()
    }

    fn line(lang: &str, prob: f64) -> Vec<u8> {
        format!(r#"{{"lang": ["{lang}", "x", "y"], "prob": [{prob}, 0.1, 0.1], "text": "t"}}"#)
            .into_bytes()
    }

    #[test]
    fn drains_and_reports_counts() {
        let dir = TempDir::new().unwrap();
        let pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 1 << 20);
        let router = Router::by_language(mapping(), DEFAULT_THRESHOLD);
        let mut driver = Driver::new(pool, router);
        driver.start().unwrap();

        driver.route(&line("fin_Latn", 0.9)).unwrap();
        driver.route(&line("fin_Latn", 0.3)).unwrap();
        driver.route(b"{\"text\": \"no lang\"}").unwrap();

        let summary = driver.finish().unwrap();
        assert_eq!(summary.counters.seen, 3);
        assert_eq!(summary.counters.routed, 3);
        assert_eq!(summary.counters.unknown, 2);
        assert_eq!(summary.counters.unknown_below_threshold, 1);
        assert_eq!(summary.counters.unknown_no_match, 1);
        assert_eq!(summary.pool.records, 3);

        let fi: Vec<_> = RawLines::open(&dir.path().join("fi_Latn/batch.1.jsonl"))
            .unwrap()
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(fi.len(), 1);
        let unk: Vec<_> = RawLines::open(&dir.path().join("unk/batch.1.jsonl"))
            .unwrap()
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(unk.len(), 2);
    }

    #[test]
    fn start_precreates_declared_directories() {
        let dir = TempDir::new().unwrap();
        let pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 1 << 20);
        let router = Router::by_language(mapping(), DEFAULT_THRESHOLD);
        let mut driver = Driver::new(pool, router);
        driver.start().unwrap();
        assert!(dir.path().join("fi_Latn").is_dir());
        assert!(dir.path().join("unk").is_dir());
        driver.finish().unwrap();
    }

    #[test]
    fn abort_finalizes_completed_shards() {
        let dir = TempDir::new().unwrap();
        let pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 1 << 20);
        let mut driver = Driver::new(pool, Router::fixed("fi"));
        driver.start().unwrap();
        driver.route(b"completed before the fault").unwrap();

        let err = driver.abort(PipelineError::Io(std::io::Error::other("disk gone")));
        assert!(matches!(err, PipelineError::Io(_)));
        // the shard written before the fault is renamed, not orphaned
        assert!(dir.path().join("fi/batch.1.jsonl").exists());
        assert!(!dir.path().join("fi/batch.1.jsonl.tmp").exists());
    }

    #[test]
    fn skip_counters_by_class() {
        let dir = TempDir::new().unwrap();
        let pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 1 << 20);
        let mut driver = Driver::new(pool, Router::fixed("fi"));
        driver.start().unwrap();
        driver.skip(&DecodeError::Encoding {
            line: 1,
            detail: "bad".into(),
        });
        driver.skip(&DecodeError::Base64 {
            line: 2,
            detail: "bad".into(),
        });
        let summary = driver.finish().unwrap();
        assert_eq!(summary.counters.skipped(), 2);
        assert_eq!(summary.counters.skipped_encoding, 1);
        assert_eq!(summary.counters.skipped_base64, 1);
    }
}
