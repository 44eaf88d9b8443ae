//! Exact deduplication over document text digests

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};

use crate::record::DocumentRecord;
use crate::transform::{Transform, Verdict};

pub const DUPLICATE_REASON: &str = "exact_duplicate";

/// Transform hook flagging documents whose text was already seen.
///
/// Keeps 64-bit digests rather than the texts themselves, so memory stays
/// proportional to document count, not corpus size. First occurrence is
/// kept, later ones are flagged (advisory, like every verdict).
#[derive(Default)]
pub struct ExactDedup {
    seen: FxHashSet<u64>,
}

impl ExactDedup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }

    fn digest(text: &str) -> u64 {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        hasher.finish()
    }
}

impl Transform for ExactDedup {
    fn name(&self) -> &str {
        "exact-dedup"
    }

    fn apply(&mut self, record: &mut DocumentRecord) -> Verdict {
        if self.seen.insert(Self::digest(&record.text)) {
            Verdict::Keep
        } else {
            Verdict::flag(DUPLICATE_REASON)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> DocumentRecord {
        DocumentRecord {
            text: text.to_string(),
            ..DocumentRecord::default()
        }
    }

    #[test]
    fn first_occurrence_kept_duplicates_flagged() {
        let mut dedup = ExactDedup::new();
        assert!(dedup.apply(&mut doc("sama teksti")).is_keep());
        assert_eq!(
            dedup.apply(&mut doc("sama teksti")),
            Verdict::flag(DUPLICATE_REASON)
        );
        assert!(dedup.apply(&mut doc("eri teksti")).is_keep());
        assert_eq!(dedup.unique_count(), 2);
    }

    #[test]
    fn url_does_not_affect_dedup() {
        let mut dedup = ExactDedup::new();
        let mut a = doc("yksi");
        a.url = Some("http://a".into());
        let mut b = doc("yksi");
        b.url = Some("http://b".into());
        assert!(dedup.apply(&mut a).is_keep());
        assert!(!dedup.apply(&mut b).is_keep());
    }
}
