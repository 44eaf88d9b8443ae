//! Transform hooks layered between decode and route
//!
//! Hooks run in a fixed declared order. A hook reports its outcome as a
//! [`Verdict`]; anything other than `Keep` is recorded on the record's
//! `filter` field and stops the chain, but the record is still written —
//! verdicts are advisory, enforcement belongs to downstream consumers.

use crate::record::DocumentRecord;

/// Outcome of one transform hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    /// Advisory: recorded as the filter reason, record still written.
    Flag(String),
}

impl Verdict {
    pub fn flag(reason: impl Into<String>) -> Self {
        Self::Flag(reason.into())
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// A per-document transform: annotation, filtering, deduplication.
///
/// `&mut self` allows semi-stateful hooks (the dedup set); implementations
/// must stay deterministic per record and do no I/O.
pub trait Transform {
    fn name(&self) -> &str;
    fn apply(&mut self, record: &mut DocumentRecord) -> Verdict;
}

/// Ordered chain of transform hooks.
#[derive(Default)]
pub struct TransformChain {
    hooks: Vec<Box<dyn Transform>>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Box<dyn Transform>) {
        self.hooks.push(hook)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run hooks in declared order. The first non-keep verdict wins, is
    /// written to the record's `filter` field and returned; otherwise the
    /// record is marked `keep`.
    pub fn apply(&mut self, record: &mut DocumentRecord) -> Verdict {
        for hook in &mut self.hooks {
            match hook.apply(record) {
                Verdict::Keep => {}
                Verdict::Flag(reason) => {
                    log::debug!("{}: flagged '{reason}'", hook.name());
                    record.set_verdict(&reason);
                    return Verdict::Flag(reason);
                }
            }
        }
        record.set_verdict("keep");
        Verdict::Keep
    }
}
