//! Classifier/router: map a record to its output partition key
//!
//! Pure and deterministic over the record bytes; all I/O-backed state (the
//! code mapping table) is loaded once at construction.

use regex::bytes::Regex;

use crate::langmap::LangMapping;

/// Reserved bucket for records whose language is absent, unmapped or below
/// the confidence threshold.
pub const UNKNOWN_KEY: &str = "unk";

/// Default confidence threshold below which a tag routes to `unk`.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Why a record landed in the `unk` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    NoMatch,
    Unmapped,
    BelowThreshold,
}

/// Routing outcome: the partition key plus how it was derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Key(String),
    Unknown(UnknownReason),
}

impl Route {
    pub fn key(&self) -> &str {
        match self {
            Self::Key(k) => k,
            Self::Unknown(_) => UNKNOWN_KEY,
        }
    }
}

/// Partition router over raw serialized records.
pub enum Router {
    /// Pure size bucketing: every record shares one key, the writer pool's
    /// byte ceiling does the actual bucketing.
    Fixed(String),
    /// Attribute bucketing: extract the language tag and its confidence via
    /// a byte pattern, without parsing the whole record.
    Language {
        mapping: LangMapping,
        threshold: f64,
        pattern: Regex,
    },
}

impl Router {
    pub fn fixed(key: impl Into<String>) -> Self {
        Self::Fixed(key.into())
    }

    /// Attribute router over annotated JSONL.
    ///
    /// The pattern matches the serializer's stable field order
    /// (`"lang": ["xxx_Xxxx", ...]` followed by `"prob": [p, ...]`), so a
    /// document is routed from a prefix scan of its line.
    pub fn by_language(mapping: LangMapping, threshold: f64) -> Self {
        let pattern = Regex::new(
            r#""lang": ?\["([a-z]{3}_[A-Z][a-z]{3})".*?"prob": ?\[([0-9]+\.[0-9]+)"#,
        )
        .expect("language pattern is statically valid");
        Self::Language {
            mapping,
            threshold,
            pattern,
        }
    }

    /// Classify one raw record line. Total: every input gets a key.
    pub fn classify(&self, raw: &[u8]) -> Route {
        match self {
            Self::Fixed(key) => Route::Key(key.clone()),
            Self::Language {
                mapping,
                threshold,
                pattern,
            } => {
                let caps = match pattern.captures(raw) {
                    Some(c) => c,
                    None => return Route::Unknown(UnknownReason::NoMatch),
                };
                // both capture groups are ASCII by construction
                let tag = std::str::from_utf8(&caps[1]).expect("ascii capture");
                let prob: f64 = std::str::from_utf8(&caps[2])
                    .expect("ascii capture")
                    .parse()
                    .unwrap_or(0.0);
                if prob < *threshold {
                    return Route::Unknown(UnknownReason::BelowThreshold);
                }
                match mapping.resolve(tag) {
                    Some(key) => Route::Key(key.to_string()),
                    None => Route::Unknown(UnknownReason::Unmapped),
                }
            }
        }
    }

    /// Keys that should exist before the run starts: the mapping's targets
    /// plus the reserved unknown bucket. Empty for fixed routing.
    pub fn declared_keys(&self) -> Vec<String> {
        match self {
            Self::Fixed(key) => vec![key.clone()],
            Self::Language { mapping, .. } => {
                let mut keys: Vec<String> =
                    mapping.partition_keys().map(str::to_string).collect();
                keys.push(UNKNOWN_KEY.to_string());
                keys.sort_unstable();
                keys
            }
        }
    }
}
