//! Filter criteria as transform hooks
//!
//! Thresholds and verdict strings follow the corpus-cleaning conventions:
//! the verdict names the criterion and its threshold so downstream
//! consumers can re-threshold without re-running the filter.

use crawline_core::{DocumentRecord, DomainBlocklist, Transform, Verdict};

use crate::config::Config;

pub const MIN_LENGTH: usize = 200;
pub const MIN_LANG_RATIO: f64 = 0.2;
pub const MIN_AVG_WORDS: f64 = 5.0;
pub const MIN_AVG_CHARS: f64 = 10.0;

/// Flag documents whose URL matches the adult-domain blocklist.
pub struct Explicit {
    blocklist: DomainBlocklist,
}

impl Explicit {
    pub fn new(blocklist: DomainBlocklist) -> Self {
        Self { blocklist }
    }
}

impl Transform for Explicit {
    fn name(&self) -> &str {
        "explicit"
    }

    fn apply(&mut self, record: &mut DocumentRecord) -> Verdict {
        match &record.url {
            Some(url) if self.blocklist.is_blocked(url) => Verdict::flag("adult_ut1"),
            _ => Verdict::Keep,
        }
    }
}

/// Flag documents below the average word (or character) count per segment.
pub struct AvgWords {
    cjk: bool,
}

impl AvgWords {
    pub fn new(cjk: bool) -> Self {
        Self { cjk }
    }
}

impl Transform for AvgWords {
    fn name(&self) -> &str {
        "avg-words"
    }

    fn apply(&mut self, record: &mut DocumentRecord) -> Verdict {
        let mut total = 0usize;
        let mut n_segs = 0usize;
        for seg in record.segments() {
            // space-separated word count; CJK text has no spaces, count
            // characters instead
            total += if self.cjk {
                seg.chars().count()
            } else {
                seg.split(' ').count()
            };
            n_segs += 1;
        }
        let avg = total as f64 / n_segs as f64;
        if self.cjk && avg <= MIN_AVG_CHARS {
            Verdict::flag(format!("char_avg_{}", MIN_AVG_CHARS as usize))
        } else if !self.cjk && avg <= MIN_AVG_WORDS {
            Verdict::flag(format!("word_avg_{}", MIN_AVG_WORDS as usize))
        } else {
            Verdict::Keep
        }
    }
}

/// Flag documents below the minimum character length.
pub struct MinimumLength;

impl Transform for MinimumLength {
    fn name(&self) -> &str {
        "minimum-length"
    }

    fn apply(&mut self, record: &mut DocumentRecord) -> Verdict {
        if record.text.chars().count() <= MIN_LENGTH {
            Verdict::flag(format!("length_{MIN_LENGTH}"))
        } else {
            Verdict::Keep
        }
    }
}

/// Flag documents whose segments disagree with the document language.
///
/// Tags are compared on the base code before any `_Script` suffix. A
/// document with no per-segment tags or no document language cannot pass
/// the criterion and is flagged rather than crashing the stream.
pub struct LanguageRatio;

impl LanguageRatio {
    fn ratio(record: &DocumentRecord) -> f64 {
        let doc_lang = match document_lang(record) {
            Some(l) => base_code(l).to_string(),
            None => return 0.0,
        };
        let seg_langs = match &record.seg_langs {
            Some(langs) if !langs.is_empty() => langs,
            _ => return 0.0,
        };
        let n_segs = record.segments().count();
        let matching = seg_langs
            .iter()
            .filter(|l| base_code(l) == doc_lang)
            .count();
        matching as f64 / n_segs as f64
    }
}

impl Transform for LanguageRatio {
    fn name(&self) -> &str {
        "language-ratio"
    }

    fn apply(&mut self, record: &mut DocumentRecord) -> Verdict {
        if Self::ratio(record) <= MIN_LANG_RATIO {
            Verdict::flag(format!("lang_ratio_{MIN_LANG_RATIO}"))
        } else {
            Verdict::Keep
        }
    }
}

fn document_lang(record: &DocumentRecord) -> Option<&str> {
    record
        .metadata
        .get("document_lang")
        .and_then(serde_json::Value::as_str)
        .or_else(|| record.document_lang())
}

fn base_code(tag: &str) -> &str {
    tag.split('_').next().unwrap_or(tag)
}

/// Assemble the enabled filters in their fixed order.
pub fn build_chain(
    config: &Config,
    blocklist: Option<DomainBlocklist>,
) -> crawline_core::TransformChain {
    let mut chain = crawline_core::TransformChain::new();
    if config.dedup {
        chain.push(Box::new(crawline_core::ExactDedup::new()));
    }
    if config.explicit {
        chain.push(Box::new(Explicit::new(
            blocklist.unwrap_or_else(DomainBlocklist::empty),
        )));
    }
    if config.avg_words {
        chain.push(Box::new(AvgWords::new(config.cjk)));
    }
    if config.minimum {
        chain.push(Box::new(MinimumLength));
    }
    if config.language {
        chain.push(Box::new(LanguageRatio));
    }
    chain
}
