//! Crawline Core - Common infrastructure for web-text corpus pipelines
//!
//! This crate provides the streaming sharding engine shared by every
//! pipeline variant: decompressed line sources, record decoding, routing
//! by language or size, the rotating shard writer pool, and the driver
//! that wires them together.

pub mod blocklist;
pub mod decode;
pub mod dedup;
pub mod error;
pub mod langmap;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod router;
pub mod shutdown;
pub mod sink;
pub mod source;
pub mod stats;
pub mod subproc;
pub mod transform;

// Re-exports for convenience
pub use blocklist::DomainBlocklist;
pub use decode::{DecodeError, decode_base64_segments, decode_json, decode_utf8};
pub use dedup::ExactDedup;
pub use error::PipelineError;
pub use langmap::LangMapping;
pub use logging::{IndicatifLogger, init_logging};
pub use pipeline::{Counters, Driver, RunState, RunSummary};
pub use progress::{ProgressContext, SharedProgress, upgrade_to_bar};
pub use record::{DocumentRecord, SEGMENT_DELIMITER, sanitize_segment};
pub use router::{DEFAULT_THRESHOLD, Route, Router, UNKNOWN_KEY, UnknownReason};
pub use shutdown::{
    install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag,
};
pub use sink::{Codec, PoolSummary, ShardWriter, WriterPool, cleanup_tmp_files};
pub use source::{ByteCounter, Lockstep, RawLines, ensure_exists, open_reader, open_reader_counted};
pub use subproc::{DecompressProcess, WAIT_TIMEOUT};
pub use transform::{Transform, TransformChain, Verdict};
