//! Adult-domain blocklist: immutable set lookup with subdomain stripping

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::error::PipelineError;
use crate::source::open_reader;

/// URL substrings checked in extended mode.
pub const BLOCKED_PATTERNS: [&str; 6] = ["porn", "sex", "tube", "cams", "camgirls", "mature"];

/// scheme, credentials and leading www. stripped; host captured up to the
/// first `:` or `/`
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:[^@/\n]+@)?(?:www\.)?([^:/\n]+)").expect("static pattern")
});

/// Domain set loaded once at startup and shared by reference.
///
/// Lookup also tries the domain with one and two leading labels removed, so
/// `es.example.com` matches a listed `example.com` (language subdomains and
/// the like). Safe because the lists never contain bare TLDs.
#[derive(Debug, Default)]
pub struct DomainBlocklist {
    domains: FxHashSet<String>,
    extended: bool,
}

impl DomainBlocklist {
    /// Load one domain per line (plain or compressed file).
    pub fn from_file(path: &Path, extended: bool) -> Result<Self, PipelineError> {
        use std::io::BufRead;
        let mut domains = FxHashSet::default();
        for line in open_reader(path)?.lines() {
            let line = line?;
            let domain = line.trim();
            if !domain.is_empty() {
                domains.insert(domain.to_string());
            }
        }
        log::info!("Loaded {} blocked domains from {}", domains.len(), path.display());
        Ok(Self { domains, extended })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Membership test over a full URL.
    pub fn is_blocked(&self, url: &str) -> bool {
        if let Some(domain) = extract_domain(url) {
            let mut candidate = domain;
            for _ in 0..3 {
                if self.domains.contains(candidate) {
                    return true;
                }
                match strip_label(candidate) {
                    Some(shorter) => candidate = shorter,
                    None => break,
                }
            }
        }
        if self.extended {
            let lower = url.to_ascii_lowercase();
            return BLOCKED_PATTERNS.iter().any(|p| lower.contains(p));
        }
        false
    }
}

/// Extract the host part of a URL.
pub fn extract_domain(url: &str) -> Option<&str> {
    DOMAIN_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Drop the leftmost dot-separated label, if one remains.
fn strip_label(domain: &str) -> Option<&str> {
    domain.split_once('.').map(|(_, rest)| rest)
}
