//! Crawline Batch - size-bucketed batching of warc2text collections
//!
//! Walks warc2text collection trees, pairs the base64 `text.gz` stream with
//! its line-aligned `url.gz` companion, and emits tab-separated segment
//! lines into size-bounded compressed batches `{lang}/batch.{n}.tsv.zst`.
//!
//! Also home to the single-directory operations that share the same inputs:
//! `merge` (TSV emission through external `zcat` subprocesses), `merge-meta`
//! (three lockstep zstd streams joined into JSONL documents) and `convert`
//! (tsv ↔ jsonl).

pub mod config;
pub mod convert;
pub mod merge;
pub mod merge_meta;
pub mod runner;

pub use config::Config;
pub use runner::run;
